use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use relay::{Config, Context, Fault, Next, Outcome, Request, Response, Router};
use serde_json::{Value, json};

fn router() -> Router {
    Router::with_config(Config::default())
}

fn request(method: Method, template: &str) -> Request {
    Request::builder().method(method).path(template).template(template).build()
}

fn body(res: &Response) -> Value {
    serde_json::from_str(res.body()).unwrap()
}

async fn echo_method(req: Request, _ctx: Context, _next: Next) -> Response {
    Response::text(req.method().as_str())
}

#[tokio::test]
async fn exact_route_key_beats_fallback() {
    let router = router()
        .get("/agents/{id}", echo_method)
        .delete("/agents/{id}", echo_method)
        .fallback(|_r: Request, _c: Context, _n: Next| async { Response::text("fallback") });

    let get = router.dispatch(request(Method::GET, "/agents/{id}"), Context::default()).await;
    let delete = router.dispatch(request(Method::DELETE, "/agents/{id}"), Context::default()).await;
    let put = router.dispatch(request(Method::PUT, "/agents/{id}"), Context::default()).await;

    assert_eq!(get.body(), "GET");
    assert_eq!(delete.body(), "DELETE");
    assert_eq!(put.body(), "fallback");
}

#[tokio::test]
async fn unmatched_without_fallback_is_404() {
    let res = router()
        .get("/agents", echo_method)
        .dispatch(request(Method::GET, "/unknown"), Context::default())
        .await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(body(&res)["message"], "Route not found");
}

#[tokio::test]
async fn fallback_chain_runs_like_any_other() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mark = {
        let calls = Arc::clone(&calls);
        move |req: Request, _ctx: Context, next: Next| {
            calls.lock().unwrap().push("mark");
            next.run(req)
        }
    };
    let res = router()
        .fallback((mark, |_r: Request, _c: Context, _n: Next| async {
            Response::builder().status(StatusCode::NOT_FOUND).json(r#"{"error":"Not Found"}"#)
        }))
        .dispatch(request(Method::GET, "/unknown"), Context::default())
        .await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(body(&res)["error"], "Not Found");
    assert_eq!(*calls.lock().unwrap(), ["mark"]);
}

#[tokio::test]
async fn middleware_runs_before_handler() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let first = {
        let calls = Arc::clone(&calls);
        move |req: Request, _ctx: Context, next: Next| {
            calls.lock().unwrap().push("first");
            next.run(req)
        }
    };
    let second = {
        let calls = Arc::clone(&calls);
        move |_req: Request, _ctx: Context, _next: Next| {
            calls.lock().unwrap().push("second");
            async { Response::text("done") }
        }
    };

    let res = router()
        .get("/multi", (first, second))
        .dispatch(request(Method::GET, "/multi"), Context::default())
        .await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), "done");
    assert_eq!(*calls.lock().unwrap(), ["first", "second"]);
}

#[tokio::test]
async fn returning_a_value_short_circuits() {
    let reached = Arc::new(Mutex::new(false));
    let guard = |_req: Request, _ctx: Context, _next: Next| async {
        Response::builder().status(StatusCode::UNAUTHORIZED).json(r#"{"message":"no"}"#)
    };
    let handler = {
        let reached = Arc::clone(&reached);
        move |_req: Request, _ctx: Context, _next: Next| {
            *reached.lock().unwrap() = true;
            async { Response::text("secret") }
        }
    };

    let res = router()
        .get("/secret", (guard, handler))
        .dispatch(request(Method::GET, "/secret"), Context::default())
        .await;
    assert_eq!(res.status_code(), 401);
    assert!(!*reached.lock().unwrap());
}

#[tokio::test]
async fn middleware_can_attach_data_for_later_links() {
    #[derive(Clone)]
    struct User(&'static str);

    async fn auth(mut req: Request, _ctx: Context, next: Next) -> Outcome {
        req.extensions_mut().insert(User("Raihan"));
        next.run(req).await
    }

    async fn whoami(req: Request, _ctx: Context, _next: Next) -> Response {
        let name = req.extensions().get::<User>().map_or("nobody", |u| u.0);
        Response::text(name)
    }

    let res = router()
        .get("/me", (auth, whoami))
        .dispatch(request(Method::GET, "/me"), Context::default())
        .await;
    assert_eq!(res.body(), "Raihan");
}

#[tokio::test]
async fn middleware_can_rewrite_the_downstream_response() {
    async fn tag(req: Request, _ctx: Context, next: Next) -> Outcome {
        let res = next.run(req).await?;
        Ok(res.map(|r| Response::text(format!("tagged:{}", r.body()))))
    }

    let res = router()
        .get("/t", (tag, echo_method))
        .dispatch(request(Method::GET, "/t"), Context::default())
        .await;
    assert_eq!(res.body(), "tagged:GET");
}

async fn throws_bad(_req: Request, _ctx: Context, _next: Next) -> Result<Response, &'static str> {
    Err("bad")
}

#[tokio::test]
async fn interceptor_handles_faults() {
    let res = router()
        .get("/boom", throws_bad)
        .on_error(|fault: Fault, _req: Request, _ctx: Context| async move {
            Response::builder()
                .status(StatusCode::IM_A_TEAPOT)
                .text(format!("caught {fault}"))
        })
        .dispatch(request(Method::GET, "/boom"), Context::default())
        .await;
    assert_eq!(res.status_code(), 418);
    assert_eq!(res.body(), "caught bad");
}

#[tokio::test]
async fn interceptor_sees_the_parsed_request() {
    let res = router()
        .post("/boom", throws_bad)
        .on_error(|_fault: Fault, req: Request, _ctx: Context| async move {
            Response::text(req.body().map(Value::to_string).unwrap_or_default())
        })
        .dispatch(
            Request::builder().method(Method::POST).path("/boom").body(r#"{"a":1}"#).build(),
            Context::default(),
        )
        .await;
    assert_eq!(res.body(), r#"{"a":1}"#);
}

#[tokio::test]
async fn uncaught_fault_is_normalized_500() {
    let res = router()
        .get("/boom", throws_bad)
        .dispatch(request(Method::GET, "/boom"), Context::default())
        .await;
    assert_eq!(res.status_code(), 500);
    let b = body(&res);
    assert_eq!(b["success"], false);
    assert_eq!(b["message"], "bad");
}

#[tokio::test]
async fn uncaught_fault_is_generic_without_debug() {
    let res = Router::with_config(Config { debug: false, ..Config::default() })
        .get("/boom", throws_bad)
        .dispatch(request(Method::GET, "/boom"), Context::default())
        .await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(body(&res), json!({ "success": false, "message": "Internal Server Error", "error": null }));
}

#[tokio::test]
async fn fault_skips_remaining_links() {
    let reached = Arc::new(Mutex::new(false));
    let after = {
        let reached = Arc::clone(&reached);
        move |_req: Request, _ctx: Context, _next: Next| {
            *reached.lock().unwrap() = true;
            async { Response::text("after") }
        }
    };
    let failing = |_req: Request, _ctx: Context, _next: Next| async { Err::<Response, _>("stop") };

    let res = router()
        .get("/x", (failing, after))
        .dispatch(request(Method::GET, "/x"), Context::default())
        .await;
    assert_eq!(res.status_code(), 500);
    assert!(!*reached.lock().unwrap());
}

#[tokio::test]
async fn panicking_handler_is_a_fault() {
    async fn panics(_req: Request, _ctx: Context, _next: Next) -> Response {
        panic!("handler exploded")
    }

    let res = router()
        .get("/p", panics)
        .dispatch(request(Method::GET, "/p"), Context::default())
        .await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(body(&res)["message"], "handler exploded");
}

#[tokio::test]
async fn chain_without_response_is_500() {
    async fn nothing(_req: Request, _ctx: Context, _next: Next) {}

    let res = router()
        .get("/n", nothing)
        .dispatch(request(Method::GET, "/n"), Context::default())
        .await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(body(&res)["message"], "No response returned");
}

#[tokio::test]
async fn json_body_is_visible_to_handlers() {
    async fn name(req: Request, _ctx: Context, _next: Next) -> Response {
        let name = req.body().and_then(|b| b["name"].as_str()).unwrap_or("<absent>");
        Response::text(name)
    }
    let router = router().post("/agents", name);

    let ok = Request::builder().method(Method::POST).path("/agents").body(r#"{"name":"Alice"}"#).build();
    assert_eq!(router.dispatch(ok, Context::default()).await.body(), "Alice");

    let bad = Request::builder().method(Method::POST).path("/agents").body("not json").build();
    let res = router.dispatch(bad, Context::default()).await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), "<absent>");
}

#[tokio::test]
async fn context_is_passed_through_untouched() {
    async fn who(_req: Request, ctx: Context, _next: Next) -> Response {
        Response::text(ctx.request_id)
    }
    let ctx = Context { request_id: "req-42".to_owned(), ..Context::default() };
    let res = router().get("/c", who).dispatch(request(Method::GET, "/c"), ctx).await;
    assert_eq!(res.body(), "req-42");
}

#[tokio::test]
async fn registrations_replace_fallback_and_interceptor() {
    let app = router()
        .get("/boom", throws_bad)
        .on_error(|_f: Fault, _r: Request, _c: Context| async { Response::text("first") })
        .on_error(|_f: Fault, _r: Request, _c: Context| async { Response::text("second") })
        .fallback(|_r: Request, _c: Context, _n: Next| async { Response::text("old") })
        .fallback(|_r: Request, _c: Context, _n: Next| async { Response::text("new") });

    let boom = app.dispatch(request(Method::GET, "/boom"), Context::default()).await;
    let miss = app.dispatch(request(Method::GET, "/miss"), Context::default()).await;
    assert_eq!(boom.body(), "second");
    assert_eq!(miss.body(), "new");
}
