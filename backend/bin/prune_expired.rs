use anyhow::Result;
use clap::{Arg, Command};
use spotlight::db::{beacons, requests, users, DatabaseConfig, UnitOfWork};
use spotlight::services::requests::pending_cutoff;
use spotlight::{get_db_pool, utils};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    utils::init_logging();

    let matches = Command::new("prune-expired")
        .about("Delete expired beacons and stale pending requests")
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Only report what would be deleted")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let dry_run = matches.get_flag("dry-run");

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    info!("Connected to database");

    let mut uow = UnitOfWork::begin(&pool).await?;
    let now = uow.now();
    let cutoff = pending_cutoff(now);
    let total_users = users::count_users(uow.conn()).await?;

    if dry_run {
        let expired = beacons::count_expired_beacons(uow.conn(), now).await?;
        let stale = requests::count_stale_pending(uow.conn(), cutoff).await?;
        uow.rollback().await?;
        info!(expired, stale, total_users, "dry run, nothing deleted");
        return Ok(());
    }

    let expired = beacons::delete_expired_beacons(uow.conn(), now).await?;
    let stale = requests::purge_all_stale_pending(uow.conn(), cutoff).await?;
    uow.commit().await?;

    info!(expired, stale, total_users, "pruned expired presence");
    Ok(())
}
