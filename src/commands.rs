//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use parts_scout::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Ask { question, .. } = &cli.command {
//!     println!("asking {question}");
//! }
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    models::{Availability, ProductDraft, ProductPatch},
    product_store::ProductSort,
};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Config file to use instead of the one in the config directory.
    #[arg(long, global = true, env = "PARTS_SCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Capture every HTTP request and print the log before exiting.
    #[arg(long, global = true)]
    pub debug: bool,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default config file.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Sign in and store the issued tokens.
    Login {
        #[arg(short, long)]
        email: String,

        /// Read from the terminal when omitted.
        #[arg(short, long, env = "PARTS_SCOUT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in.
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short = 'n', long)]
        full_name: String,

        #[arg(short, long, env = "PARTS_SCOUT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the stored tokens.
    Logout,

    /// Ask the assistant a single question.
    #[clap(name = "ask", alias = "a")]
    Ask {
        question: String,

        /// Treat the question as a part number lookup.
        #[arg(short = 'p', long)]
        part_number: bool,

        /// Continue an existing conversation.
        #[arg(short, long)]
        conversation: Option<i64>,
    },

    /// Chat with the assistant in a loop.
    ///
    /// This subcommand can be invoked with either 'i' or 'interactive'.
    #[clap(name = "interactive", alias = "i")]
    Interactive {
        /// Open an existing conversation first.
        #[arg(short, long)]
        conversation: Option<i64>,
    },

    /// List past conversations.
    History {
        #[arg(long, default_value_t = 0)]
        skip: u32,

        /// Defaults to `history_page_size` from the config.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Print a conversation with its suggested products.
    Show { id: i64 },

    /// Delete a conversation.
    Delete { id: i64 },

    /// Create an empty conversation.
    New { title: Option<String> },

    /// Browse and edit the product catalog.
    #[command(subcommand)]
    Products(ProductCommands),

    /// Show or edit the account profile.
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// One page of the catalog.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Search by free text or part number.
    Search(SearchArgs),

    Get { id: i64 },

    Create(CreateProductArgs),

    Update(UpdateProductArgs),

    Delete { id: i64 },

    /// Values the search filters accept.
    Filters,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(short = 'p', long)]
    pub part_number: bool,

    #[arg(long = "brand")]
    pub brands: Vec<String>,

    #[arg(long = "model")]
    pub models: Vec<String>,

    #[arg(long = "availability", value_parser = parse_availability)]
    pub availability: Vec<Availability>,

    #[arg(long, value_enum, default_value_t = ProductSort::Relevance)]
    pub sort: ProductSort,

    /// Only show manufacturer-validated parts.
    #[arg(long)]
    pub validated_only: bool,
}

#[derive(Args, Debug)]
pub struct CreateProductArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub part_number: String,

    #[arg(long)]
    pub brand: String,

    #[arg(long)]
    pub price: f64,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value_t = 0.0)]
    pub shipping_cost: f64,

    #[arg(long, default_value = "")]
    pub estimated_shipping: String,

    #[arg(long, default_value_t = 0)]
    pub stock: i64,

    #[arg(long, value_parser = parse_availability, default_value = "in-stock")]
    pub availability: Availability,

    #[arg(long = "model")]
    pub models: Vec<String>,

    #[arg(long = "image")]
    pub images: Vec<String>,

    #[arg(long)]
    pub validated: bool,

    #[arg(long)]
    pub shipping_country: Option<String>,
}

impl CreateProductArgs {
    pub fn into_draft(self) -> ProductDraft {
        ProductDraft {
            name: self.name,
            part_number: self.part_number,
            brand: self.brand,
            description: self.description,
            images: self.images,
            price: self.price,
            shipping_cost: self.shipping_cost,
            estimated_shipping: self.estimated_shipping,
            stock: self.stock,
            availability: self.availability,
            compatible_models: self.models.into_iter().collect(),
            validated_by_manufacturer: self.validated,
            shipping_country: self.shipping_country,
        }
    }
}

#[derive(Args, Debug)]
pub struct UpdateProductArgs {
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub part_number: Option<String>,

    #[arg(long)]
    pub brand: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub shipping_cost: Option<f64>,

    #[arg(long)]
    pub estimated_shipping: Option<String>,

    #[arg(long)]
    pub stock: Option<i64>,

    #[arg(long, value_parser = parse_availability)]
    pub availability: Option<Availability>,

    /// Replaces the compatible model list.
    #[arg(long = "model")]
    pub models: Option<Vec<String>>,

    #[arg(long)]
    pub validated: Option<bool>,
}

impl UpdateProductArgs {
    pub fn to_patch(&self) -> ProductPatch {
        ProductPatch {
            name: self.name.clone(),
            part_number: self.part_number.clone(),
            brand: self.brand.clone(),
            description: self.description.clone(),
            images: None,
            price: self.price,
            shipping_cost: self.shipping_cost,
            estimated_shipping: self.estimated_shipping.clone(),
            stock: self.stock,
            availability: self.availability,
            compatible_models: self
                .models
                .as_ref()
                .map(|models| models.iter().cloned().collect()),
            validated_by_manufacturer: self.validated,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    Show,

    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Prompt for a new password.
        #[arg(long)]
        password: bool,
    },

    /// Upload an image as the avatar.
    Avatar { path: PathBuf },
}

fn parse_availability(value: &str) -> Result<Availability, String> {
    match serde_json::from_value(serde_json::Value::String(value.to_string())) {
        Ok(Availability::Unknown) | Err(_) => Err(format!(
            "unknown availability '{value}', expected in-stock, limited or out-of-stock"
        )),
        Ok(availability) => Ok(availability),
    }
}
