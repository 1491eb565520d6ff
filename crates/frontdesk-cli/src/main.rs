mod dashboard;

use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use owo_colors::OwoColorize;
use tokio::sync::broadcast;

use frontdesk_worker::{ConnectionStatus, DashboardEvent, FrontdeskWorker, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("frontdesk=info".parse()?)
                .add_directive("frontdesk_worker=info".parse()?)
                .add_directive("frontdesk_ipc=info".parse()?)
                .add_directive("frontdesk_db=info".parse()?),
        )
        .init();

    let config = load_config().wrap_err("Failed to load configuration")?;
    println!("📁 Provider directory: {}", config.provider.dir.display());

    let worker = Arc::new(
        FrontdeskWorker::new(config.clone())
            .await
            .wrap_err("Failed to create worker")?,
    );

    let (_, events) = worker.subscribe();
    tokio::spawn(print_events(worker.clone(), events));

    // A failed start leaves the status in `error`; the dashboard still
    // comes up so it can show it.
    if let Err(e) = worker.start().await {
        tracing::error!(error = %e, "Failed to start provider");
    }

    let listener = tokio::net::TcpListener::bind(&config.dashboard.bind)
        .await
        .wrap_err_with(|| format!("Failed to bind dashboard on {}", config.dashboard.bind))?;
    println!("🌐 Dashboard on http://{}", config.dashboard.bind);

    axum::serve(listener, dashboard::router(worker.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Dashboard server failed")?;

    println!("👋 Shutting down...");
    worker.stop().await.wrap_err("Failed to stop provider")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for Ctrl-C");
    }
}

async fn print_events(worker: Arc<FrontdeskWorker>, mut events: broadcast::Receiver<DashboardEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&worker, event),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(worker: &FrontdeskWorker, event: DashboardEvent) {
    match event {
        DashboardEvent::StatusUpdate(update) => match update.status {
            ConnectionStatus::QrReady => {
                println!("\n📱 Scan this QR code with the business phone:");
                if let Some(code) = worker.context().connection.pending_challenge() {
                    print_qr_code(&code);
                }
            }
            ConnectionStatus::Connecting => println!("\n{}", "🔐 Authenticated, connecting...".yellow()),
            ConnectionStatus::Ready => println!("\n{}", "✅ Session ready".green().bold()),
            ConnectionStatus::Disconnected => println!(
                "\n{} {}",
                "❌ Disconnected:".red(),
                update.payload.unwrap_or_default()
            ),
            ConnectionStatus::Error => println!(
                "\n{} {}",
                "❌ Error:".red().bold(),
                update.payload.unwrap_or_default()
            ),
        },
        DashboardEvent::ChatUpdate(update) => {
            let direction = if update.message.from_me { "→" } else { "←" };
            println!(
                "  {} {}: {}",
                direction,
                update.chat_name.bold(),
                update.message.body
            );
        }
        DashboardEvent::ChatsSynced => println!("\n{}", "💬 Chats synced".cyan()),
        DashboardEvent::BotStatusChanged { enabled } => {
            let state = if enabled { "on" } else { "off" };
            println!("\n🤖 Auto-replies {}", state.bold());
        }
        DashboardEvent::CampaignAttributed { chat_id, campaign } => {
            println!("\n🎯 Lead {} → {}", chat_id, campaign.name.magenta());
        }
    }
}

fn print_qr_code(code: &str) {
    if let Err(e) = qr2term::print_qr(code) {
        eprintln!("Failed to print QR code: {}", e);
        println!("Raw QR data: {}", code);
    }
}
