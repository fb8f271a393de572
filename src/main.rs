use chainrouter::cli::{run_cli, Cli};
use chainrouter::logging::{init_logging_with_config, LogConfig};
use chainrouter::reflect::{HandlerBase, HandlerObject};
use chainrouter::{render_http_error, routes, App, Context, HttpError, Options};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;

/// Demo handler object mounted at `/api`
#[derive(Default)]
struct Api {
    base: HandlerBase,
}

#[derive(Debug, Deserialize)]
struct Login {
    user: String,
}

#[routes]
impl Api {
    /// GET /api
    pub fn get(&self, ctx: &mut Context) {
        if let Err(err) = ctx.to_json(&json!({ "service": "chainrouter" }), None) {
            ctx.next_with(err);
        }
    }

    /// GET /api/authorize
    pub fn get_authorize(&self, ctx: &mut Context) {
        if ctx.header("authorization").is_some() {
            ctx.status(204);
        } else {
            ctx.next_with(HttpError::new(401));
        }
    }

    /// GET /api/to/json
    pub fn get_to_json(&self, ctx: &mut Context) {
        let id = ctx.request_id().to_string();
        if let Err(err) = ctx.json(&json!({ "request_id": id })) {
            ctx.next_with(err);
        }
    }

    /// POST /api/:param
    pub fn post_param(&self, ctx: &mut Context) {
        let param = ctx.params("param").unwrap_or_default().to_string();
        match ctx.read_body::<Login>() {
            Ok(login) => {
                if let Err(err) = ctx.to_json(&json!({ "param": param, "user": login.user }), None) {
                    ctx.next_with(err);
                }
            }
            Err(err) => ctx.next_with(HttpError::with_message(400, err.to_string())),
        }
    }

    /// PUT /api/:param?
    pub fn put_params(&self, ctx: &mut Context) {
        let param = ctx
            .params("param")
            .filter(|p| !p.is_empty())
            .unwrap_or("none")
            .to_string();
        ctx.send(format!("updated {param}"));
    }
}

impl HandlerObject for Api {
    fn init(&mut self) {
        self.base.set_prefix("/api");
    }

    fn prefix(&self) -> &str {
        self.base.prefix()
    }

    fn preload(&self, ctx: &mut Context) {
        ctx.set("X-Api-Version", "1");
        ctx.next();
    }
}

fn demo_app(options: Options) -> App {
    let mut app = App::new(options);
    app.get("/", |ctx| {
        ctx.send("chainrouter");
    })
    .handle(Api::default())
    .on_error(render_http_error);
    app
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging_with_config(&LogConfig::from_env())?;
    run_cli(Cli::parse(), demo_app)
}
