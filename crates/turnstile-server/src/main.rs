//! Server binary

#![warn(missing_docs)]

mod http;
mod issuer;

use std::thread;

use tracing_subscriber::EnvFilter;
use turnstile_core::{Config, RequestHandler};

use issuer::{OpaqueTokenIssuer, TokenIssuer};

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the admission gate and reservation engine
    config: Config,

    /// Port for the HTTP server to listen on
    port: u16,
    /// Host for the HTTP server to listen on
    host: String,
    /// Number of HTTP handler threads
    handler_threads: u32,
}

impl Opts {
    fn from_args() -> Self {
        let mut opts = Opts {
            port: 8585,
            host: String::from("127.0.0.1"),
            config: Config {
                seats: 100,
                active_capacity: 50,
                active_ttl_ms: 30_000,
                waiting_ttl_ms: 600_000,
                reservation_ttl_ms: 60_000,
                hold_ttl_ms: 20_000,
                sweep_interval_ms: 2_000,
            },
            handler_threads: 64,
        };

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-port" => opts.port = arg.parse().expect("-port takes a decimal u16"),
                    "-host" => opts.host = arg,
                    "-seats" => {
                        opts.config.seats = arg.parse().expect("-seats takes a decimal u32")
                    }
                    "-active-capacity" => {
                        opts.config.active_capacity =
                            arg.parse().expect("-active-capacity takes a decimal u32")
                    }
                    "-active-ttl-ms" => {
                        opts.config.active_ttl_ms =
                            arg.parse().expect("-active-ttl-ms takes a decimal u64")
                    }
                    "-waiting-ttl-ms" => {
                        opts.config.waiting_ttl_ms =
                            arg.parse().expect("-waiting-ttl-ms takes a decimal u64")
                    }
                    "-reservation-ttl-ms" => {
                        opts.config.reservation_ttl_ms =
                            arg.parse().expect("-reservation-ttl-ms takes a decimal u64")
                    }
                    "-hold-ttl-ms" => {
                        opts.config.hold_ttl_ms =
                            arg.parse().expect("-hold-ttl-ms takes a decimal u64")
                    }
                    "-sweep-interval-ms" => {
                        opts.config.sweep_interval_ms =
                            arg.parse().expect("-sweep-interval-ms takes a decimal u64")
                    }
                    "-handler-threads" => {
                        opts.handler_threads =
                            arg.parse().expect("-handler-threads takes a decimal u32")
                    }
                    _ => {
                        eprintln!("Error: ignoring unknown option {opt}");
                        std::process::exit(1);
                    }
                }
                option = None;
            } else {
                option = Some(arg);
            }
        }
        if let Some(opt) = option {
            eprintln!("Error: ignoring leftover option {opt}");
            std::process::exit(1);
        }

        opts
    }
}

fn http_loop<H: RequestHandler>(
    server: &tiny_http::Server,
    issuer: &dyn TokenIssuer,
    handler: &H,
) {
    loop {
        let rq = server.recv().expect("HTTP receive failed");
        if let Some(rq) = http::parse(rq, issuer) {
            handler.handle(rq);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::from_args();
    tracing::info!(?opts, "starting");

    let server = tiny_http::Server::http((opts.host.as_str(), opts.port)).unwrap();
    let issuer = OpaqueTokenIssuer;

    let frontdesk = turnstile_engine::launch(&opts.config);

    thread::scope(|s| {
        for i in 0..opts.handler_threads {
            thread::Builder::new()
                .name(format!("handler_{i}"))
                .spawn_scoped(s, || http_loop(&server, &issuer, &frontdesk))
                .unwrap();
        }
    });
}
