//! # stock-meta-ai
//!
//! AI-powered stock media metadata: generate titles, descriptions, keywords,
//! categories, or a single caption for an image using Google Gemini structured
//! output.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module, which
//! handles the full read → prompt → request → normalize flow for one file:
//!
//! ```rust,no_run
//! use stock_meta_ai::ai::Mode;
//! use stock_meta_ai::config::Config;
//! use stock_meta_ai::pipeline::{build_model, collect_images, process_image};
//! use tokio_util::sync::CancellationToken;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config from file (API key, generation settings, retry policy)
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let model = build_model(&config)?;
//!     let cancel = CancellationToken::new();
//!
//!     for path in collect_images(&[PathBuf::from("./uploads")]) {
//!         let result = process_image(&path, &model, &config, Mode::Metadata, &cancel, |delay| {
//!             eprintln!("Retrying in {}s...", delay.as_secs());
//!         })
//!         .await;
//!
//!         match (result.result, result.error) {
//!             (Some(generated), _) => println!("{}", serde_json::to_string_pretty(&generated)?),
//!             (None, Some(err)) => eprintln!("Error processing {}: {err}", path.display()),
//!             (None, None) => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The prompt builder and the request executor can be driven directly with any
//! [`ai::ContentModel`]:
//!
//! ```rust,no_run
//! use stock_meta_ai::ai::{GeminiService, ImageData, Mode, build_prompt};
//! use stock_meta_ai::config::{AdvanceTitle, ControlSettings};
//! use stock_meta_ai::executor::execute;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = ControlSettings {
//!         keywords_count: 30,
//!         advance_title: AdvanceTitle { white_bg: true, ..Default::default() },
//!         ..Default::default()
//!     };
//!     let prompt = build_prompt(&settings, Mode::Metadata);
//!
//!     let service = GeminiService::new("AIza...".into());
//!     let image = ImageData::from_bytes(&std::fs::read("bike.jpg")?, "image/jpeg");
//!
//!     let generated = execute(
//!         &service,
//!         "gemini-2.5-flash",
//!         &prompt,
//!         Some(&image),
//!         &settings,
//!         Mode::Metadata,
//!         |_| {},
//!     )
//!     .await?;
//!     println!("{generated:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: model trait, Gemini backend, prompt builder, response schemas and parsing
//! - [`config`]: configuration types and loading/saving
//! - [`executor`]: retrying request executor
//! - [`normalize`]: title and keyword post-processing
//! - [`pipeline`]: image discovery, encoding and per-file processing

pub mod ai;
pub mod config;
pub mod executor;
pub mod normalize;
pub mod pipeline;
