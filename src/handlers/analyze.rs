use std::collections::HashMap;
use std::time::Instant;

use actix_web::{HttpResponse, Responder, post, web};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::connectivity::backend::AnalysisRequest;
use crate::jobs::JobData;
use crate::utils::voxel_grid::PhaseId;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// 资源目录下的文件名，例如 "paste.img"
    pub file: String,
    /// 只分析这些相，缺省为全部非背景相
    pub phases: Option<Vec<PhaseId>>,
    /// 相编号到名称的映射，例如 {"1": "C3S"}
    #[serde(default)]
    pub names: HashMap<PhaseId, String>,
}

#[derive(Serialize, Clone)]
pub struct AnalyzeResponse {
    pub job_id: String,
    pub file: String,
    pub file_size: u64,
    pub shape: [usize; 3],
    pub backend: &'static str,
}

#[post("/connectivity/analyze")]
pub async fn analyze_connectivity(
    data: web::Data<AppState>,
    payload: web::Json<AnalyzeRequest>,
) -> impl Responder {
    match submit_analysis(&data, payload.into_inner()) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => err,
    }
}

pub(crate) fn invalid_file(file: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "文件路径必须位于资源目录内",
        "file": file,
    }))
}

/// 创建连通性分析任务并在后台执行
///
/// 只做轻量级检查（解析器、文件是否存在、文件头中的 shape）后立即返回 job_id；
/// 完整解析与分析在阻塞线程池中进行，不占用请求线程。
fn submit_analysis(
    app_state: &web::Data<AppState>,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, HttpResponse> {
    let Some(file_path) = app_state.resource_path(&request.file) else {
        return Err(invalid_file(&request.file));
    };

    let Some((parser, _)) = app_state.parser_registry.find_parser_for_file(&file_path) else {
        let supported = app_state.parser_registry.supported_extensions();
        return Err(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "不支持的文件格式",
            "file": request.file,
            "supported_extensions": supported,
        })));
    };

    let file_size = match std::fs::metadata(&file_path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            return Err(HttpResponse::NotFound().json(serde_json::json!({
                "error": "文件不存在或无法访问",
                "file": request.file,
                "details": e.to_string(),
            })));
        }
    };

    let shape = parser.get_shape_from_file(&file_path).map_err(|e| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": "读取文件头失败",
            "file": request.file,
            "parser": parser.name(),
            "details": e.to_string(),
        }))
    })?;

    let (job_id, job) = app_state
        .job_store
        .insert(JobData::new(request.file.clone(), request.phases.clone()));

    let parser_registry = app_state.parser_registry.clone();
    let backend = app_state.backend.clone();
    let analysis_request = AnalysisRequest {
        phases: request.phases,
        names: request.names,
    };
    let job_id_clone = job_id.clone();

    actix_web::rt::spawn(async move {
        job.mark_running();
        let started = Instant::now();
        let token = job.token.clone();
        let path = file_path.clone();

        let outcome = web::block(move || {
            let Some((parser, _)) = parser_registry.find_parser_for_file(&path) else {
                return Err("找不到解析器".to_string());
            };
            let grid = parser.parse_from_file(&path).map_err(|e| e.to_string())?;
            backend
                .analyze(&grid, &analysis_request, &token)
                .map_err(|e| e.to_string())
        })
        .await;

        match outcome {
            Ok(Ok(output)) => {
                info!(
                    "[后台分析] 任务 {} 完成，耗时 {}ms",
                    job_id_clone,
                    started.elapsed().as_millis()
                );
                job.complete(output);
            }
            Ok(Err(e)) => {
                error!("[后台分析] 任务 {} 失败: {}", job_id_clone, e);
                job.fail(e);
            }
            Err(e) => {
                error!("[后台分析] 任务 {} 的工作线程异常: {}", job_id_clone, e);
                job.fail(e.to_string());
            }
        }
    });

    Ok(AnalyzeResponse {
        job_id,
        file: request.file,
        file_size,
        shape,
        backend: app_state.backend.name(),
    })
}
