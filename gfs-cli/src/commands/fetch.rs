use std::io::{self, Write};

use anyhow::{Context as _, Result, anyhow, bail};
use clap::Args;
use client::RequestOptions;
use http::{HeaderName, HeaderValue, Method};

use crate::context::Context;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured base URL
    pub target: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Request body, sent as is
    #[arg(long, short)]
    pub data: Option<String>,

    /// Extra header in `Name: value` form; may be repeated
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,
}

pub async fn fetch(ctx: &Context, args: FetchArgs) -> Result<()> {
    let options = build_options(&args)?;
    let response = ctx
        .requests
        .send(&args.target, options)
        .await
        .with_context(|| format!("request to {} failed", args.target))?;

    eprintln!("{}", response.status);
    let mut stdout = io::stdout().lock();
    stdout.write_all(&response.body)?;
    if !response.body.ends_with(b"\n") {
        writeln!(stdout)?;
    }

    if !response.is_success() {
        bail!("server responded with {}", response.status);
    }
    Ok(())
}

fn build_options(args: &FetchArgs) -> Result<RequestOptions> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("invalid HTTP method '{}'", args.method))?;
    let mut options = RequestOptions::get().method(method);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if let Some(data) = &args.data {
        options = options.body(data.clone());
    }
    Ok(options)
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header '{raw}' must look like 'Name: value'"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in '{raw}'"))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in '{raw}'"))?;
    Ok((name, value))
}
