use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, Responder, get, middleware, web::Data,
};
use clap::Parser;
use duration_string::DurationString;
use operator::{
    config::{FileTemplates, Settings},
    controller::State,
    health_controller::run_health,
    must_gather_config_controller::run_must_gather_config,
    must_gather_job_controller::run_must_gather_job,
    must_gather_service_controller::run_must_gather_service,
    telemetry,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address of the health and diagnostics server
    #[arg(long, env = "LISTEN_ADDRESS", default_value = "0.0.0.0:8080")]
    listen: String,
    /// Directory holding the operand templates
    #[arg(long, env = "MANIFEST_DIR", default_value = "/manifests")]
    manifest_dir: PathBuf,
    /// Deadline for each Kubernetes API call
    #[arg(long, env = "API_TIMEOUT", default_value = "30s")]
    api_timeout: DurationString,
    /// Delay before a failed reconcile is retried
    #[arg(long, env = "ERROR_REQUEUE", default_value = "1m")]
    error_requeue: DurationString,
}

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
    let args = Args::parse();
    telemetry::init().await;

    let settings = Settings {
        manifest_dir: args.manifest_dir.clone(),
        api_timeout: args.api_timeout.into(),
        error_requeue: args.error_requeue.into(),
    };
    let templates = Arc::new(FileTemplates::new(&settings.manifest_dir));
    let state = State::new(settings, templates);
    let client = kube::Client::try_default().await?;

    let health_ctrl = run_health(client.clone(), state.clone());
    let mgs_ctrl = run_must_gather_service(client.clone(), state.clone());
    let job_ctrl = run_must_gather_job(client.clone(), state.clone());
    let config_ctrl = run_must_gather_config(client, state.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
    })
    .bind(&args.listen)?
    .shutdown_timeout(5);

    // All runtimes implements graceful shutdown, so poll until all are done
    let (_, _, _, _, server_result) =
        tokio::join!(health_ctrl, mgs_ctrl, job_ctrl, config_ctrl, server.run());
    server_result?;
    Ok(())
}
