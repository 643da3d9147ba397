use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    let supported = data.parser_registry.supported_extensions();
    HttpResponse::Ok().json(serde_json::json!({
        "message": "微结构连通性分析服务",
        "endpoints": [
            "POST /connectivity/analyze",
            "GET /connectivity/job?job_id=<id>",
            "GET /connectivity/job/text?job_id=<id>",
            "POST /connectivity/job/cancel?job_id=<id>",
            "GET /connectivity/labels?file=<filename>&phase=<id>",
        ],
        "backend": data.backend.name(),
        "supported_extensions": supported,
        "resource_dir": data.resource_dir,
    }))
}
