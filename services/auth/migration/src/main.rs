#[tokio::main]
async fn main() {
    sea_orm_migration::cli::run_cli(vantra_auth_migration::Migrator).await;
}
