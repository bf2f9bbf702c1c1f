use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};
use clap::Parser;
use kube::Client;
use operator::{self, config::Settings, secret_controller::{State, run_secret}, telemetry};

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    telemetry::init().await;

    let client = Client::try_default().await?;
    let state = State::default();
    let bind = settings.bind.clone();
    let secret_ctrl = run_secret(state.clone(), client, settings);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
    })
    .bind(bind)?
    .shutdown_timeout(5);

    // Both the controller and the server shut down gracefully on signal
    let (_, server_result) = tokio::join!(secret_ctrl, server.run());
    server_result?;
    Ok(())
}
