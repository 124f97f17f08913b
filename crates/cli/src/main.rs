//! Soko CLI - the storefront's command-line screens.
//!
//! # Usage
//!
//! ```bash
//! # Sign in / sign up
//! soko login -u jane -p pw
//! soko register -u wanjiku -p pw --confirm pw --role customer
//!
//! # Browse and manage the catalog
//! soko products list
//! soko products add --name "Fresh Sukuma Wiki" --price 50.00 --stock 100
//! soko products delete 3
//!
//! # Shop (customers)
//! soko cart show
//! soko cart add 3 --qty 2
//! soko cart set 7 3
//! soko cart remove 7
//! soko cart watch
//!
//! # Shop overview (owners)
//! soko dashboard
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
// The CLI's printed output is its user interface
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use clap::{Parser, Subcommand};

mod commands;

use commands::App;

#[derive(Parser)]
#[command(name = "soko")]
#[command(author, version, about = "Soko storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        /// Username (letters, numbers, dots or underscores)
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Password confirmation
        #[arg(long)]
        confirm: String,

        /// Email (optional)
        #[arg(short, long)]
        email: Option<String>,

        /// Account type: customer (browse & shop) or owner (sell products)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Phone number (optional)
        #[arg(long)]
        contact: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Browse and manage the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// The shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Shop overview (owners)
    Dashboard,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List all products
    List,
    /// List a new product (owners)
    Add {
        /// Product name
        #[arg(long)]
        name: String,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Price (KSh)
        #[arg(long)]
        price: rust_decimal::Decimal,

        /// Stock quantity
        #[arg(long)]
        stock: u32,

        /// Barcode (optional)
        #[arg(long)]
        barcode: Option<String>,

        /// SKU (optional)
        #[arg(long)]
        sku: Option<String>,

        /// Product image file (optional)
        #[arg(long)]
        image: Option<std::path::PathBuf>,
    },
    /// Delete a product (owners)
    Delete {
        /// Product ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: i64,

        /// Quantity
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Change an item's quantity
    Set {
        /// Cart item ID
        item_id: i64,

        /// New quantity (never below 1)
        qty: u32,
    },
    /// Remove an item from the cart
    Remove {
        /// Cart item ID
        item_id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Keep the cart badge count fresh until interrupted
    Watch,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::bootstrap()?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&app, username, password).await?;
        }
        Commands::Register {
            username,
            password,
            confirm,
            email,
            role,
            contact,
        } => {
            commands::auth::register(&app, username, password, confirm, email, &role, contact)
                .await?;
        }
        Commands::Logout => commands::auth::logout(&app),
        Commands::Whoami => commands::auth::whoami(&app),
        Commands::Products { action } => match action {
            ProductsAction::List => commands::products::list(&app).await?,
            ProductsAction::Add {
                name,
                description,
                price,
                stock,
                barcode,
                sku,
                image,
            } => {
                let form = soko_client::catalog::NewProduct {
                    name,
                    description,
                    price,
                    stock_quantity: stock,
                    barcode,
                    sku,
                };
                commands::products::add(&app, form, image).await?;
            }
            ProductsAction::Delete { id, yes } => {
                commands::products::delete(&app, id, yes).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app).await?,
            CartAction::Add { product_id, qty } => {
                commands::cart::add(&app, product_id, qty).await?;
            }
            CartAction::Set { item_id, qty } => commands::cart::set(&app, item_id, qty).await?,
            CartAction::Remove { item_id, yes } => {
                commands::cart::remove(&app, item_id, yes).await?;
            }
            CartAction::Watch => commands::cart::watch(&app).await?,
        },
        Commands::Dashboard => commands::dashboard::show(&app).await?,
    }
    Ok(())
}
