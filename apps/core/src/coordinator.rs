use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::session::{SessionEvent, SessionHandle};

pub const ACTIVATION_BYTE: u8 = 42;
pub const DEFAULT_PORT: u16 = 62321;

const ACCEPTOR_THREAD_NAME: &str = "keylaunch-acceptor";
const SIGNAL_READ_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum CoordinationError {
    /// Neither an existing leader could be reached nor the port claimed.
    Unavailable {
        connect: std::io::Error,
        bind: std::io::Error,
    },
    Io(std::io::Error),
}

impl Display for CoordinationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { connect, bind } => write!(
                f,
                "no instance can be established (connect: {connect}; bind: {bind})"
            ),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for CoordinationError {}

impl From<std::io::Error> for CoordinationError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// The well-known place instances meet.
pub trait Endpoint: Send {
    fn connect(&self, timeout: Duration) -> std::io::Result<TcpStream>;
    fn bind(&self) -> std::io::Result<TcpListener>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct LoopbackEndpoint {
    addr: SocketAddr,
}

impl LoopbackEndpoint {
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
        }
    }
}

impl Endpoint for LoopbackEndpoint {
    fn connect(&self, timeout: Duration) -> std::io::Result<TcpStream> {
        TcpStream::connect_timeout(&self.addr, timeout)
    }

    fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.addr)
    }

    fn describe(&self) -> String {
        self.addr.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub probe_timeout: Duration,
    /// Skip the initial activation when this process becomes leader.
    pub quiet: bool,
}

#[derive(Debug)]
pub enum Role {
    Leader(TcpListener),
    Follower,
}

pub enum Election {
    Leader(LeaderHandle),
    Follower,
}

/// Keeps the acceptor thread's handle. The thread lives as long as the
/// process; it is never joined on the normal path.
pub struct LeaderHandle {
    local_addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl LeaderHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_accepting(&self) -> bool {
        !self.acceptor.is_finished()
    }
}

pub struct InstanceCoordinator {
    endpoint: Box<dyn Endpoint>,
    options: CoordinatorOptions,
    session: SessionHandle,
}

impl InstanceCoordinator {
    pub fn new(
        endpoint: Box<dyn Endpoint>,
        options: CoordinatorOptions,
        session: SessionHandle,
    ) -> Self {
        Self {
            endpoint,
            options,
            session,
        }
    }

    /// Runs the election and, when this process wins, starts the acceptor.
    pub fn start(self) -> Result<Election, CoordinationError> {
        let listener = match elect(self.endpoint.as_ref(), self.options.probe_timeout)? {
            Role::Follower => {
                log::info!("forwarded activation to leader at {}", self.endpoint.describe());
                return Ok(Election::Follower);
            }
            Role::Leader(listener) => listener,
        };

        let local_addr = listener.local_addr()?;
        log::info!("leader listening on {local_addr} quiet={}", self.options.quiet);

        let acceptor_session = self.session.clone();
        let acceptor = std::thread::Builder::new()
            .name(ACCEPTOR_THREAD_NAME.to_string())
            .spawn(move || run_acceptor(listener, acceptor_session))?;

        if !self.options.quiet && self.session.activate().is_err() {
            log::warn!("session closed before initial activation");
        }

        Ok(Election::Leader(LeaderHandle {
            local_addr,
            acceptor,
        }))
    }
}

/// Decides whether this process leads or follows.
///
/// A failed probe leads to a bind attempt. Losing the bind means another
/// process claimed the port between our probe and our bind, so the probe is
/// retried once before giving up.
pub fn elect(endpoint: &dyn Endpoint, probe_timeout: Duration) -> Result<Role, CoordinationError> {
    match signal_leader(endpoint, probe_timeout) {
        Ok(()) => return Ok(Role::Follower),
        Err(error) => log::debug!("no leader at {}: {error}", endpoint.describe()),
    }

    let bind_error = match endpoint.bind() {
        Ok(listener) => return Ok(Role::Leader(listener)),
        Err(error) => error,
    };
    log::warn!(
        "lost bind race on {} ({bind_error}); probing again",
        endpoint.describe()
    );

    match signal_leader(endpoint, probe_timeout) {
        Ok(()) => Ok(Role::Follower),
        Err(connect) => Err(CoordinationError::Unavailable {
            connect,
            bind: bind_error,
        }),
    }
}

fn signal_leader(endpoint: &dyn Endpoint, timeout: Duration) -> std::io::Result<()> {
    let mut stream = endpoint.connect(timeout)?;
    stream.write_all(&[ACTIVATION_BYTE])?;
    stream.flush()
}

/// Serves activation requests until the session goes away or the listener
/// fails for good. A fatal failure is reported to the UI thread, which owns
/// the decision to exit.
pub fn run_acceptor(listener: TcpListener, session: SessionHandle) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(error) if is_transient(&error) => {
                log::warn!("accept failed transiently: {error}");
                continue;
            }
            Err(error) => {
                log::error!("acceptor stopped: {error}");
                let _ = session.post(SessionEvent::CoordinatorFailed(error.to_string()));
                return;
            }
        };

        match read_signal(stream) {
            Ok(Some(ACTIVATION_BYTE)) => {
                log::debug!("activation from {peer}");
                if session.activate().is_err() {
                    log::info!("session closed; acceptor exiting");
                    return;
                }
            }
            Ok(Some(other)) => log::debug!("ignoring byte {other} from {peer}"),
            Ok(None) => log::debug!("empty connection from {peer}"),
            Err(error) => log::debug!("unreadable connection from {peer}: {error}"),
        }
    }
}

fn read_signal(mut stream: TcpStream) -> std::io::Result<Option<u8>> {
    stream.set_read_timeout(Some(SIGNAL_READ_TIMEOUT))?;
    let mut byte = [0_u8; 1];
    let read = stream.read(&mut byte)?;
    Ok((read == 1).then_some(byte[0]))
}

fn is_transient(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::Interrupted
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
