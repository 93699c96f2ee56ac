use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metalvpn_app::api_client::ApiClient;
use metalvpn_app::balance::Balance;
use metalvpn_app::config::AppConfig;
use metalvpn_app::models::{OperationRecord, PaymentMethod, PendingPayment};
use metalvpn_app::presenter::Presenter;
use metalvpn_app::services::guide::Platform;
use metalvpn_app::services::modal::ModalId;
use metalvpn_app::services::settings_service::SettingKind;
use metalvpn_app::state::AppContext;

#[derive(Parser, Debug)]
#[command(author, version, about = "MetalVPN mini app client", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Telegram user id
    #[arg(long)]
    user_id: Option<i64>,

    /// Local state file
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show profile, balance and operation history
    Profile,
    /// Create a top-up and wait until it is paid (Ctrl-C cancels)
    Topup {
        #[arg(long)]
        amount: String,
        /// telegram-stars, ton-ton or usdt-ton
        #[arg(long, default_value = "ton-ton")]
        method: PaymentMethod,
    },
    /// Confirm a payment by its memo
    Confirm {
        #[arg(long)]
        memo: String,
    },
    /// Price for a plan
    Price {
        /// 1..10 or "custom"
        #[arg(long, default_value = "1")]
        devices: String,
        /// Device count for the custom option
        #[arg(long)]
        custom: Option<String>,
        #[arg(long, default_value = "1")]
        period: String,
    },
    /// Change language or currency
    Settings { kind: SettingKind, value: String },
    /// Which setup guide fits this device
    Guide {
        #[arg(long, default_value = "")]
        user_agent: String,
        #[arg(long, default_value = "")]
        platform: String,
        /// Show this guide instead of the detected one
        #[arg(long)]
        switch: Option<Platform>,
    },
}

/// Prints what the mini app would render.
#[derive(Default)]
struct ConsolePresenter {
    completed: Notify,
}

impl Presenter for ConsolePresenter {
    fn show_payment(&self, payment: &PendingPayment) {
        println!("Payment #{}", payment.id);
        println!("  amount: {} ({})", payment.amount, payment.method);
        println!("  wallet: {}", payment.wallet_address);
        println!("  memo:   {}", payment.memo);
        println!("  open:   {}", payment.transfer_url());
        println!("Waiting for the transfer...");
    }

    fn show_alert(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn show_balance(&self, balance: &Balance, history: &[OperationRecord]) {
        println!("Balance: {}", balance.total);
        println!(
            "  Telegram Stars: {}  TON: {}  USDT: {}",
            balance.telegram_stars, balance.ton_coin, balance.usdt_ton
        );
        for op in history {
            println!(
                "  {}  {:<12} {:>8} {:?}",
                op.formatted_date(),
                op.kind.label(),
                op.amount,
                op.direction
            );
        }
    }

    fn payment_completed(&self, payment: &PendingPayment, balance: &Balance) {
        println!("Payment #{} received, balance {}", payment.id, balance.total);
        self.completed.notify_one();
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config =
        AppConfig::with_overrides(AppConfig::load(), cli.api_url.as_deref(), cli.user_id)?;
    if let Some(path) = &cli.storage {
        config.storage_path = Some(path.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metalvpn_app=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli).context("Failed to load configuration")?;
    tracing::info!("API: {}", config.api_url);
    tracing::info!("User: {}", config.user_id);

    let api = Arc::new(ApiClient::new(config.api_url.clone()));
    let presenter = Arc::new(ConsolePresenter::default());
    let mut ctx = AppContext::boot(&config, api, presenter.clone()).await;

    match cli.command {
        Command::Profile => {
            let snapshot = ctx.refresh_profile().await;
            if let Some(profile) = &snapshot.profile {
                println!("User: {}", profile.display_name());
            }
            println!("Language: {}  Currency: {}", snapshot.language, snapshot.currency);
        }
        Command::Topup { amount, method } => {
            ctx.open_modal(ModalId::TopUp).await;
            let form = ctx.modals.topup_mut();
            form.input_custom(&amount);
            form.select_method(method);

            match ctx.confirm_topup().await {
                Some(Ok(_)) => {}
                Some(Err(e)) => anyhow::bail!(e),
                None => anyhow::bail!("Choose an amount and a payment method"),
            }

            tokio::select! {
                _ = presenter.completed.notified() => {}
                _ = tokio::signal::ctrl_c() => {
                    ctx.close_modal(ModalId::TopUp).await;
                    println!("Payment cancelled");
                }
            }
        }
        Command::Confirm { memo } => {
            let status = ctx.confirm_by_memo(&memo).await?;
            println!("Status: {:?}", status);
        }
        Command::Price {
            devices,
            custom,
            period,
        } => {
            ctx.plans.select_devices(&devices).await;
            if let Some(count) = custom {
                ctx.plans.input_custom_devices(&count).await;
            }
            ctx.plans.select_period(&period).await;
            println!("{}", ctx.plans.price_label().await);
        }
        Command::Settings { kind, value } => {
            ctx.open_modal(ModalId::Settings(kind)).await;
            match ctx.choose_setting(kind, &value).await {
                Some(saved) => println!("{}: {}", kind.title(), saved),
                None => anyhow::bail!(
                    "Unknown value {:?}, expected one of {}",
                    value,
                    kind.options().join(", ")
                ),
            }
        }
        Command::Guide {
            user_agent,
            platform,
            switch,
        } => {
            if !user_agent.is_empty() || !platform.is_empty() {
                ctx.device.user_agent = user_agent;
                ctx.device.platform = platform;
            }
            let detected = ctx
                .guide
                .init_platform(&ctx.device.user_agent, &ctx.device.platform);
            if let Some(p) = switch {
                ctx.guide.switch_platform(p, false);
            }
            println!("Detected: {}", detected.label());
            println!("Guide: {}", ctx.guide.current().label());
        }
    }

    Ok(())
}
