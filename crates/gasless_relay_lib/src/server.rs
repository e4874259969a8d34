use crate::db::ops::*;
use crate::queue::ChannelProducer;
use crate::relay::TransferRequest;
use actix_web::web::Data;
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use serde_json::json;
use sqlx::SqlitePool;

pub struct ServerData {
    pub db_connection: SqlitePool,
    pub producer: ChannelProducer,
}

fn error_response(mut builder: actix_web::HttpResponseBuilder, error: &str) -> HttpResponse {
    builder.json(json!({
        "success": false,
        "error": error,
    }))
}

pub async fn transfer_submit(data: Data<Box<ServerData>>, body: web::Bytes) -> impl Responder {
    let mut request: TransferRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            log::debug!("Rejected transfer request: {}", err);
            return error_response(HttpResponse::BadRequest(), "invalid request");
        }
    };
    request.order_id = uuid::Uuid::new_v4().to_string();

    if let Err(err) = data.producer.enqueue(&request).await {
        log::error!("Failed to enqueue order {}: {}", request.order_id, err);
        return error_response(HttpResponse::InternalServerError(), "internal server error");
    }
    log::info!(
        "Order {} queued on {} for chain {}",
        request.order_id,
        data.producer.topic(),
        request.chain
    );

    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "ERC20 transfer initiated",
        "order_id": request.order_id,
        "success": true,
    }))
}

pub async fn transfer_status(data: Data<Box<ServerData>>, req: HttpRequest) -> impl Responder {
    let order_id = match req.match_info().get("order_id") {
        Some(order_id) => order_id,
        None => return error_response(HttpResponse::BadRequest(), "invalid request"),
    };

    match get_order(&data.db_connection, order_id).await {
        Ok(Some(order)) => HttpResponse::Ok().json(json!({
            "success": true,
            "status": order.status,
            "error": order.error_message.unwrap_or_default(),
        })),
        Ok(None) => error_response(HttpResponse::NotFound(), "order not found"),
        Err(err) => {
            log::error!("Failed to read order {}: {}", order_id, err);
            error_response(HttpResponse::InternalServerError(), "internal server error")
        }
    }
}

pub async fn health() -> impl Responder {
    "OK"
}

pub fn runtime_web_scope(scope: Scope, server_data: Data<Box<ServerData>>) -> Scope {
    scope
        .app_data(server_data)
        .route("/transfer", web::post().to(transfer_submit))
        .route("/transfer/{order_id}", web::get().to(transfer_status))
        .route("/health", web::get().to(health))
}
