use actix_web::{HttpResponse, Responder, get, http::header::ContentType, post, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::jobs::JobStatus;

#[derive(Deserialize)]
pub struct JobQuery {
    pub job_id: String,
}

fn invalid_job(job_id: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "无效的 job_id",
        "job_id": job_id,
    }))
}

/// 查询任务状态；完成后附带结构化报告（外部后端为原始文本）
#[get("/connectivity/job")]
pub async fn get_job(data: web::Data<AppState>, query: web::Query<JobQuery>) -> impl Responder {
    let Some(job) = data.job_store.get(&query.job_id) else {
        return invalid_job(&query.job_id);
    };

    HttpResponse::Ok().json(serde_json::json!({
        "job_id": query.job_id,
        "file": job.file,
        "phases": job.phases,
        "status": job.status(),
        "output": job.output(),
    }))
}

/// 以纯文本返回报告
#[get("/connectivity/job/text")]
pub async fn get_job_text(
    data: web::Data<AppState>,
    query: web::Query<JobQuery>,
) -> impl Responder {
    let Some(job) = data.job_store.get(&query.job_id) else {
        return invalid_job(&query.job_id);
    };

    match (job.status(), job.output()) {
        (JobStatus::Completed, Some(output)) => HttpResponse::Ok()
            .content_type(ContentType::plaintext())
            .body(output.to_text()),
        (JobStatus::Failed { error }, _) => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "分析失败",
                "job_id": query.job_id,
                "details": error,
            }))
        }
        (status, _) => HttpResponse::Accepted().json(serde_json::json!({
            "error": "分析仍在进行中，请稍后重试",
            "job_id": query.job_id,
            "status": status,
        })),
    }
}

/// 请求取消任务；正在分析的相会继续完成，尚未开始的相标记为已取消
#[post("/connectivity/job/cancel")]
pub async fn cancel_job(
    data: web::Data<AppState>,
    query: web::Query<JobQuery>,
) -> impl Responder {
    let Some(job) = data.job_store.get(&query.job_id) else {
        return invalid_job(&query.job_id);
    };

    job.cancel();
    HttpResponse::Ok().json(serde_json::json!({
        "job_id": query.job_id,
        "cancel_requested": true,
        "status": job.status(),
    }))
}
