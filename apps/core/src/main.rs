fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match keylaunch_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[keylaunch] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = keylaunch_core::runtime::run_with_options(options) {
        log::error!("runtime failed: {error}");
        log::logger().flush();
        eprintln!("[keylaunch] runtime failed: {error}");
        std::process::exit(1);
    }
}
