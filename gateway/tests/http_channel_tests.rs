//! HTTP channel served over a real socket.

use bytes::Bytes;
use conduit_gateway::content::Content;
use conduit_gateway::envelope::{Code, Fault};
use conduit_gateway::gateway::Gateway;
use conduit_gateway::http::{
    FaultRedirector, HttpChannel, HttpChannelBuilder, PlaceholderRender, TextConverter,
};
use conduit_gateway::infrastructure::server;
use conduit_gateway::params::Param;
use conduit_gateway::requester::Requester;
use conduit_gateway::resource::handler_fn;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;

fn gateway() -> Arc<Gateway> {
    let gateway = Arc::new(Gateway::new());
    gateway
        .register_local(
            "echo",
            handler_fn(|r: Requester| async move {
                Ok::<_, Fault>(Content::text(r.params().require_str("msg")?))
            }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "plain/*",
            handler_fn(|_| async { Ok::<_, Fault>(Content::text("plain text")) }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "whoami",
            handler_fn(|r: Requester| async move { Ok::<_, Fault>(Content::text(r.client())) }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "upload/size",
            handler_fn(|r: Requester| async move {
                match r.params().get("doc") {
                    Some(Param::Part { file_name, data }) => Ok(Content::Json(
                        json!({"name": file_name, "size": data.len()}),
                    )),
                    _ => Err(Fault::invalid_parameter("doc", "file part required")),
                }
            }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "report",
            handler_fn(|_| async {
                Ok::<_, Fault>(Content::Bytes {
                    name: "report.csv".into(),
                    data: Bytes::from_static(b"id,total\n1,42\n"),
                })
            }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "admin/*",
            handler_fn(|_| async { Err::<Content, _>(Fault::AccessDenied("admins only".into())) }),
            false,
        )
        .unwrap();
    gateway
        .register_local(
            "broken",
            handler_fn(|_| async { Err::<Content, _>(Fault::Generic("disk on fire".into())) }),
            false,
        )
        .unwrap();
    gateway
}

fn templates() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.html"), "Hello {{name}}: {{> echo}}").unwrap();
    std::fs::write(dir.path().join("error.html"), "Sorry ({{code}}): {{error}}").unwrap();
    dir
}

fn channel(templates: &TempDir) -> HttpChannelBuilder {
    HttpChannel::builder(gateway())
        .context_path("/app/")
        .render(PlaceholderRender::new(templates.path()))
}

async fn spawn(channel: Arc<HttpChannel>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::app(&channel, None);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn query_parameters_reach_the_resource() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;

    let body: Value = client()
        .get(format!("{base}/app/echo?msg=hello"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({"code": "success", "error": null, "content": "hello"}));
}

#[tokio::test]
async fn json_body_reaches_the_resource() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;

    let body: Value = client()
        .post(format!("{base}/app/echo"))
        .json(&json!({"msg": "from json"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["content"], "from json");
}

#[tokio::test]
async fn faults_become_envelopes() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;
    let http = client();

    let missing: Value = http
        .get(format!("{base}/app/echo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(missing["code"], Code::InvalidParameter.as_str());
    assert_eq!(missing["content"], "msg");

    let unrouted: Value = http
        .get(format!("{base}/app/nothing/here"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unrouted["code"], Code::RequestHandlingFault.as_str());

    let outside: Value = http
        .get(format!("{base}/elsewhere/echo?msg=x"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outside["code"], Code::RequestHandlingFault.as_str());
}

#[tokio::test]
async fn multipart_file_parts_arrive_as_bytes() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;
    let form = reqwest::multipart::Form::new()
        .text("note", "attached")
        .part(
            "doc",
            reqwest::multipart::Part::bytes(vec![1u8; 3000]).file_name("scan.pdf"),
        );

    let body: Value = client()
        .post(format!("{base}/app/upload/size"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["content"], json!({"name": "scan.pdf", "size": 3000}));
}

#[tokio::test]
async fn binary_results_are_streamed_with_headers() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;

    let response = client().get(format!("{base}/app/report")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"report.csv\""
    );
    assert_eq!(response.headers()[CONTENT_LENGTH], "14");
    assert_eq!(&response.bytes().await.unwrap()[..], b"id,total\n1,42\n");
}

#[tokio::test]
async fn converter_table_selects_text_output() {
    let dir = templates();
    let base = spawn(channel(&dir).converter("plain/*", TextConverter).unwrap().build()).await;

    let response = client().get(format!("{base}/app/plain/page")).send().await.unwrap();

    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(response.text().await.unwrap(), "plain text");
}

#[tokio::test]
async fn redirect_without_dot_is_an_http_redirect() {
    let dir = templates();
    let base = spawn(
        channel(&dir)
            .redirector(FaultRedirector::on(Code::AccessDenied, "login"))
            .build(),
    )
    .await;

    let response = client().get(format!("{base}/app/admin/users")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/app/login");
}

#[tokio::test]
async fn redirect_with_dot_renders_a_template() {
    let dir = templates();
    let base = spawn(
        channel(&dir)
            .redirector(FaultRedirector::on(Code::AccessDenied, "login"))
            .redirector(FaultRedirector::any("error.html"))
            .build(),
    )
    .await;

    let response = client().get(format!("{base}/app/broken")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        "Sorry (generic_failure): disk on fire"
    );
}

#[tokio::test]
async fn views_render_with_sub_invocations() {
    let dir = templates();
    let base = spawn(channel(&dir).view("home", "home.html").unwrap().build()).await;

    let response = client()
        .get(format!("{base}/app/home?name=Ana&msg=welcome"))
        .send()
        .await
        .unwrap();

    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(response.text().await.unwrap(), "Hello Ana: welcome");
}

#[tokio::test]
async fn view_with_converter_is_wrapped_as_content() {
    let dir = templates();
    let base = spawn(
        channel(&dir)
            .view("home", "home.html")
            .unwrap()
            .converter("home", conduit_gateway::http::JsonConverter)
            .unwrap()
            .build(),
    )
    .await;

    let body: Value = client()
        .get(format!("{base}/app/home?name=Bo&msg=hey"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["content"], "Hello Bo: hey");
}

#[tokio::test]
async fn client_identity_prefers_header_over_peer() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;
    let http = client();

    let peer: Value = http
        .get(format!("{base}/app/whoami"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(peer["content"], "127.0.0.1");

    let named: Value = http
        .get(format!("{base}/app/whoami"))
        .header("x-client-id", "billing")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(named["content"], "billing");
}

#[tokio::test]
async fn health_routes_bypass_the_channel() {
    let dir = templates();
    let base = spawn(channel(&dir).build()).await;

    let response = client().get(format!("{base}/health/live")).send().await.unwrap();
    assert_eq!(response.text().await.unwrap(), "OK");
}
