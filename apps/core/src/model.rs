#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub command: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub visible: bool,
    folded_name: String,
    folded_command: Option<String>,
    folded_description: Option<String>,
}

impl Entry {
    pub fn new(name: &str, command: &str) -> Self {
        Self::from_owned(name.to_string(), Some(command.to_string()), None, None, true)
    }

    pub fn from_owned(
        name: String,
        command: Option<String>,
        description: Option<String>,
        icon: Option<String>,
        visible: bool,
    ) -> Self {
        let folded_name = fold_case(&name);
        let folded_command = command.as_deref().map(fold_case);
        let folded_description = description.as_deref().map(fold_case);
        Self {
            name,
            command,
            description,
            icon,
            visible,
            folded_name,
            folded_command,
            folded_description,
        }
    }

    pub fn with_description(self, description: &str) -> Self {
        Self::from_owned(
            self.name,
            self.command,
            Some(description.to_string()),
            self.icon,
            self.visible,
        )
    }

    pub fn with_icon(self, icon: &str) -> Self {
        Self::from_owned(
            self.name,
            self.command,
            self.description,
            Some(icon.to_string()),
            self.visible,
        )
    }

    pub fn hidden(self) -> Self {
        Self::from_owned(
            self.name,
            self.command,
            self.description,
            self.icon,
            false,
        )
    }

    pub fn folded_name(&self) -> &str {
        &self.folded_name
    }

    pub fn folded_command(&self) -> Option<&str> {
        self.folded_command.as_deref()
    }

    pub fn folded_description(&self) -> Option<&str> {
        self.folded_description.as_deref()
    }
}

pub fn fold_case(input: &str) -> String {
    input.to_lowercase()
}
