use clap::Parser;
use lifecycle_stubs::server::{bind_socket, run_controlplane, run_mock, ServerState};
use std::net::{IpAddr, SocketAddr};
use tokio::try_join;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    #[clap(short, long, default_value = "127.0.0.1", env = "BIND_ADDRESS")]
    bind: IpAddr,
    #[clap(short, long, default_value = "0", env = "CONTROL_PORT")]
    control_port: u16,
    #[clap(short, long, default_value = "0", env = "MOCK_PORT")]
    mock_port: u16,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = Opts::parse();

    let subscriber = FmtSubscriber::builder()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mock = bind_socket(SocketAddr::new(opts.bind, opts.mock_port)).await?;
    let control = bind_socket(SocketAddr::new(opts.bind, opts.control_port)).await?;
    let state = ServerState::with_mock_url(format!("http://{}:{}", opts.bind, mock.port));

    info!("Control plane on http://{}:{}/", opts.bind, control.port);
    info!("Mock on http://{}:{}/", opts.bind, mock.port);

    try_join!(
        run_controlplane(control.listener, state.clone()),
        run_mock(mock.listener, state),
    )?;
    Ok(())
}
