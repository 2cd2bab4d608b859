#[actix_web::main]
async fn main() -> std::io::Result<()> {
    frc_picklist_lib::run().await
}
