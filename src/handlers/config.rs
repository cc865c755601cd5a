use crate::config::AppConfig;
use crate::{error::AppError, error::AppResult, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

fn config_view(config: &AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "hub": {
            "window_ms": config.hub.window_ms,
            "pacing_ms": config.hub.pacing_ms,
            "outbound_queue_capacity": config.hub.outbound_queue_capacity,
            "max_frame_bytes": config.hub.max_frame_bytes,
            "heartbeat_interval_secs": config.hub.heartbeat_interval_secs,
            "client_timeout_secs": config.hub.client_timeout_secs
        },
        "transcription": {
            "backend": config.transcription.backend,
            "base_url": config.transcription.base_url,
            "model": config.transcription.model,
            "language": config.transcription.language,
            "audio_format": config.transcription.audio_format,
            "sample_rate": config.transcription.sample_rate,
            "channels": config.transcription.channels,
            "timeout_ms": config.transcription.timeout_ms,
            "max_concurrent": config.transcription.max_concurrent,
            "api_key_set": config.transcription.api_key.is_some()
        }
    })
}

pub async fn get_config(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_view(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_view(&current_config)
    })))
}
