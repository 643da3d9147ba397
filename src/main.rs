use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use log::{error, info};

use microstructure_connectivity::app_state::AppState;
use microstructure_connectivity::config::{AnalysisConfig, ServerConfig};
use microstructure_connectivity::connectivity::backend_from_config;
use microstructure_connectivity::jobs::JobStore;
use microstructure_connectivity::routes;
use microstructure_connectivity::utils::parser_registry::ParserRegistry;

fn to_io_error<E: std::fmt::Display>(e: E) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let server_config = ServerConfig::from_env().map_err(to_io_error)?;
    let analysis_config = AnalysisConfig::from_env().map_err(to_io_error)?;

    // 初始化解析器注册表
    let parser_registry = Arc::new(ParserRegistry::new());
    info!("已注册的解析器扩展名: {:?}", parser_registry.supported_extensions());

    let backend = backend_from_config(&analysis_config).map_err(|e| {
        error!("创建分析后端失败: {}", e);
        to_io_error(e)
    })?;
    info!(
        "分析后端: {}，工作线程 {} 个，安全上限 {:?}，截止时间 {:?}",
        backend.name(),
        analysis_config.effective_worker_threads(),
        analysis_config.limits,
        analysis_config.deadline
    );

    let job_store = Arc::new(JobStore::with_ttl(server_config.job_ttl));
    let app_state = web::Data::new(AppState {
        parser_registry,
        resource_dir: server_config.resource_dir.clone(),
        job_store: job_store.clone(),
        backend: Arc::from(backend),
        limits: analysis_config.limits,
    });

    // 启动后台清理任务：定期清理过期的任务
    // 每 5 分钟执行一次清理，避免长期占用内存
    let cleanup_store = job_store.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(std::time::Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            let cleaned_count = cleanup_store.cleanup_expired();
            if cleaned_count > 0 {
                info!(
                    "[清理任务] 清理了 {} 个过期任务，当前剩余: {} 个任务",
                    cleaned_count,
                    cleanup_store.job_count()
                );
            }
        }
    });

    info!(
        "服务器启动在 http://{}:{}",
        server_config.host, server_config.port
    );
    info!("资源目录: {}", server_config.resource_dir);
    info!("任务 TTL: {} 分钟", job_store.default_ttl().as_secs() / 60);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((server_config.host.as_str(), server_config.port))?
    .run()
    .await
}
