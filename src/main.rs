#[actix_web::main]
async fn main() -> std::io::Result<()> {
    onboarding_lib::run().await
}
