//! Admin backend - binary entry point.
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    lawfirm_admin_backend::run().await;
}
