use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::analyze::invalid_file;
use crate::labels::{labels_to_le_bytes, ranked_labels};
use crate::utils::voxel_grid::PhaseId;

#[derive(Deserialize)]
pub struct LabelsQuery {
    pub file: String,
    pub phase: PhaseId,
}

/// 导出某个相周期合并后的组件标签（小端 u32，x 变化最快）
/// 标签 1 为体积最大的组件，0 表示不属于该相
#[get("/connectivity/labels")]
pub async fn get_phase_labels(
    data: web::Data<AppState>,
    query: web::Query<LabelsQuery>,
) -> impl Responder {
    let Some(file_path) = data.resource_path(&query.file) else {
        return invalid_file(&query.file);
    };
    if data
        .parser_registry
        .find_parser_for_file(&file_path)
        .is_none()
    {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "不支持的文件格式",
            "file": query.file,
            "supported_extensions": data.parser_registry.supported_extensions(),
        }));
    }

    let parser_registry = data.parser_registry.clone();
    let limits = data.limits;
    let phase = query.phase;
    let outcome = web::block(move || {
        let Some((parser, _)) = parser_registry.find_parser_for_file(&file_path) else {
            return Err("找不到解析器".to_string());
        };
        let grid = parser.parse_from_file(&file_path).map_err(|e| e.to_string())?;
        let field = ranked_labels(&grid, phase, limits).map_err(|e| e.to_string())?;
        let bytes = labels_to_le_bytes(&field).map_err(|e| e.to_string())?;
        Ok((field.shape(), field.count(), bytes))
    })
    .await;

    let (shape, count, bytes) = match outcome {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "计算组件标签失败",
                "file": query.file,
                "phase": query.phase,
                "details": e,
            }));
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "工作线程异常",
                "details": e.to_string(),
            }));
        }
    };

    HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .append_header(("X-Grid-Shape", format!("{},{},{}", shape[0], shape[1], shape[2])))
        .append_header(("X-Phase", query.phase.to_string()))
        .append_header(("X-Component-Count", count.to_string()))
        .body(bytes)
}
