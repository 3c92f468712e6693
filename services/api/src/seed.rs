use crate::infra::{open_store, password_hasher};
use clap::Args;
use el_correo::config::AppConfig;
use el_correo::error::AppError;
use el_correo::seed::{SeedOptions, SeedReport, Seeder, UserSeedOptions};
use el_correo::store::Store;
use el_correo::telemetry;

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    /// Family dependents each worker is topped up to
    #[arg(long, default_value_t = 2)]
    pub(crate) per_worker: usize,
    /// Delete every family dependent before topping up
    #[arg(long)]
    pub(crate) wipe_cargas: bool,
    /// Extra sample accounts on top of the four base users
    #[arg(long, default_value_t = 10)]
    pub(crate) extra: usize,
    /// Reset the password of sample accounts that already exist
    #[arg(long)]
    pub(crate) update_password: bool,
}

impl SeedArgs {
    pub(crate) fn options(&self) -> SeedOptions {
        SeedOptions {
            users: UserSeedOptions {
                extra: self.extra,
                update_password: self.update_password,
                ..UserSeedOptions::default()
            },
            per_worker: self.per_worker,
            wipe_cargas: self.wipe_cargas,
        }
    }
}

/// Bootstrap plus dependents, the routine run by `seed` and by `serve` with `APP_SEED_DEMO`.
pub(crate) async fn seed_store<S>(
    seeder: &Seeder<S>,
    options: &SeedOptions,
) -> Result<Vec<SeedReport>, AppError>
where
    S: Store + 'static,
{
    let mut reports = seeder.bootstrap(options).await?;
    reports.push(
        seeder
            .seed_cargas(options.per_worker, options.wipe_cargas)
            .await?,
    );
    Ok(reports)
}

pub(crate) async fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let store = open_store(&config).await?;
    let seeder = Seeder::new(store, password_hasher(&config));
    let reports = seed_store(&seeder, &args.options()).await?;

    let rendered = serde_json::to_string_pretty(&reports).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
