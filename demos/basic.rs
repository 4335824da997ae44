//! Minimal relay example: CRUD-style agent endpoints behind an auth
//! middleware, served by the local gateway emulator.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -H 'authorization: token' http://localhost:3000/agents/42
//!   curl -X POST http://localhost:3000/agents \
//!        -H 'authorization: token' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/agents/42          # 401 via the error interceptor
//!   curl http://localhost:3000/nowhere            # fallback

use http::StatusCode;
use relay::{Config, Context, Fault, Next, Normalizer, Outcome, Request, Response, Router, Server, middleware};
use serde_json::json;

#[derive(Clone)]
struct User {
    name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/agents/{id}",    (middleware::trace, auth, get_agent))
        .post("/agents",        (middleware::trace, auth, create_agent))
        .delete("/agents/{id}", (middleware::trace, auth, delete_agent))
        .fallback(not_found)
        .on_error(on_error);

    if let Err(e) = Server::bind("127.0.0.1:3000").serve(app).await {
        eprintln!("server error: {e}");
    }
}

// Attach the caller for downstream links, or fail the chain.
async fn auth(mut req: Request, _ctx: Context, next: Next) -> Outcome {
    if req.header("authorization").is_none() {
        return Err("Unauthorized or invalid token".into());
    }
    req.extensions_mut().insert(User { name: "raihan".to_owned() });
    next.run(req).await
}

// GET /agents/{id}
async fn get_agent(req: Request, _ctx: Context, _next: Next) -> Response {
    let user = req.extensions().get::<User>().map(|u| u.name.clone());
    Response::json(json!({ "message": "GET agent", "id": req.param("id"), "user": user }).to_string())
}

// POST /agents — the body arrives parsed; malformed JSON shows up as `None`.
async fn create_agent(req: Request, _ctx: Context, _next: Next) -> Outcome {
    let Some(data) = req.body() else {
        return Err(json!([{ "constraints": { "isNotEmpty": "Body cannot be empty" } }]).into());
    };
    Ok(Some(
        Response::builder()
            .status(StatusCode::CREATED)
            .header("Location", "/agents/99")
            .json(json!({ "message": "Agent created", "data": data }).to_string()),
    ))
}

// DELETE /agents/{id} → 204 No Content
async fn delete_agent(_req: Request, _ctx: Context, _next: Next) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found(_req: Request, _ctx: Context, _next: Next) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .json(r#"{"error":"Route not found"}"#)
}

// Validation failures are the caller's fault; bare messages come from `auth`.
async fn on_error(fault: Fault, _req: Request, ctx: Context) -> Response {
    let status = match fault {
        Fault::Constraints(_) | Fault::Validation(_) => 400,
        Fault::Message(_) => 401,
        _ => 500,
    };
    Normalizer::new(Config::from_env()).fault(&fault, status, &[("X-Request-Id", ctx.request_id.as_str())])
}
