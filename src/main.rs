use clap::{Parser, Subcommand};

use storefront_orders::cart::{self, CartError, CartItem};
use storefront_orders::config::Settings;
use storefront_orders::db::{Db, OrderStore};
use storefront_orders::error::Error;
use storefront_orders::identity;
use storefront_orders::markup;
use storefront_orders::order::{line_total, ItemId, OrderId, OrderStatus,
                               OrderTab, ShippingInfo, UserId, UserRole};
use storefront_orders::status_update::{self, Notice};

type HandlerResult = Result<(), Error>;

#[derive(Parser)]
#[command(name = "storefront-orders")]
#[command(about = "Inspect and advance storefront orders from the terminal")]
struct Cli {
    /// Settings file, defaults to ./storefront.toml
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Who is asking
#[derive(clap::Args)]
struct Caller {
    /// Id of the signed in user
    #[arg(long)]
    user: u64,

    /// Role remembered from the last session, used if the profile can't be read
    #[arg(long)]
    cached_role: Option<String>,
}

/// Where to ship, blanks are filled with placeholders
#[derive(clap::Args)]
struct ShippingArgs {
    #[arg(long)]
    ship_name: Option<String>,
    #[arg(long)]
    ship_address: Option<String>,
    #[arg(long)]
    ship_city: Option<String>,
    #[arg(long)]
    ship_phone: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print every status with its display name and color
    Statuses,
    /// Show an order's status and the updates available to the caller
    Options {
        #[command(flatten)]
        caller: Caller,
        order: u64,
    },
    /// Move an order to a new status
    SetStatus {
        #[command(flatten)]
        caller: Caller,
        order: u64,
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
    /// Change quantity of one order line by DELTA (operators only)
    AdjustItem {
        #[command(flatten)]
        caller: Caller,
        order: u64,
        item: u64,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Add a product to a user's cart
    CartAdd {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        product: u64,
        /// Line as NAME:PRICE_CENTS:QUANTITY
        #[arg(value_parser = parse_item)]
        item: (String, u64, u32),
    },
    /// Show a user's cart
    Cart {
        #[arg(long)]
        user: u64,
    },
    /// Place a pending order with everything in the user's cart
    Place {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        number: String,
        #[command(flatten)]
        shipping: ShippingArgs,
    },
    /// List a user's orders
    List {
        #[arg(long)]
        user: u64,
        /// Show completed and cancelled orders instead of active ones
        #[arg(long)]
        history: bool,
    },
    /// Set the role stored in a user's profile
    SetRole {
        user: u64,
        #[arg(value_parser = parse_role)]
        role: UserRole,
    },
    /// Print some store statistics
    Stats,
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    OrderStatus::from_id(s).ok_or_else(|| {
        let ids: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.id()).collect();
        format!("unknown status \"{s}\", expected one of {}", ids.join(", "))
    })
}

fn parse_role(s: &str) -> Result<UserRole, String> {
    UserRole::from_id(s)
        .ok_or_else(|| format!("unknown role \"{s}\", expected seller or operator"))
}

fn parse_item(s: &str) -> Result<(String, u64, u32), String> {
    let mut parts = s.rsplitn(3, ':');
    let qty = parts.next().and_then(|q| q.parse().ok());
    let price = parts.next().and_then(|p| p.parse().ok());
    let name = parts.next().filter(|n| !n.is_empty());
    match (name, price, qty) {
        (Some(name), Some(price), Some(qty))
            if qty > 0 && line_total(price, qty).is_some() =>
            Ok((name.to_string(), price, qty)),
        _ => Err(format!("bad item \"{s}\", expected NAME:PRICE_CENTS:QUANTITY")),
    }
}

async fn open_db(settings: &Settings) -> Result<Db, Error> {
    #[cfg(feature = "redis_db")]
    let db = Db::new(settings).await?;
    #[cfg(not(feature = "redis_db"))]
    let db = {
        log::warn!("built without redis_db, using a throwaway in-memory store \
(prefix {} ignored)", settings.key_prefix);
        Db::new().await?
    };
    Ok(db)
}

async fn caller_role(db: &mut Db, caller: &Caller) -> UserRole {
    identity::resolve_role(db, UserId(caller.user), caller.cached_role.as_deref()).await
}

fn print_statuses() {
    for s in OrderStatus::ALL.iter().cloned() {
        let next: Vec<&str> = s.next_statuses().iter().map(|n| n.id()).collect();
        println!("{:<10} {:<11} {}  -> {}",
                 s.id(), s.display_name(), s.color(),
                 if next.is_empty() { "(terminal)".to_string() } else { next.join(", ") });
    }
}

async fn show_options(db: &mut Db, caller: Caller, oid: OrderId) -> HandlerResult {
    let role = caller_role(db, &caller).await;
    let options = match status_update::status_options(db, role, oid).await {
        Ok(options) => options,
        Err(e) => {
            println!("{}", Notice::for_update(&Err(e)));
            return Ok(())
        }
    };
    println!("Current status: {}", markup::status_badge(options.current));
    if let Some(notice) = Notice::for_options(&options) {
        println!("{notice}");
        return Ok(())
    }
    for s in options.available.iter() {
        println!("  {:<10} {}", s.id(), s.display_name());
    }
    Ok(())
}

async fn set_status(
    db: &mut Db,
    caller: Caller,
    oid: OrderId,
    status: OrderStatus,
) -> HandlerResult {
    let role = caller_role(db, &caller).await;
    let res = status_update::update_order_status(db, role, oid, status).await;
    println!("{}", Notice::for_update(&res));
    match res {
        Err(e) if e.is_retryable() => Err(e.into()),
        _ => Ok(()),
    }
}

async fn adjust_item(
    db: &mut Db,
    caller: Caller,
    oid: OrderId,
    item_id: ItemId,
    delta: i64,
) -> HandlerResult {
    let role = caller_role(db, &caller).await;
    let Some(mut order) = db.get_order(oid).await? else {
        println!("Could not find order {oid}");
        return Ok(())
    };
    let quantity = match order.adjust_item_quantity(role, item_id, delta) {
        Ok(item) => item.quantity,
        Err(e) => {
            println!("{e}");
            return Ok(())
        }
    };
    if !db.set_item_quantity(oid, item_id, quantity).await? {
        println!("Order {oid} changed while editing, try again");
        return Ok(())
    }
    println!("{}", markup::format_order(&order));
    Ok(())
}

async fn cart_add(
    db: &mut Db,
    uid: UserId,
    product_id: u64,
    (name, price, qty): (String, u64, u32),
) -> HandlerResult {
    let item = CartItem {
        product_id,
        product_name: name,
        product_price_cents: price,
        quantity: qty,
    };
    let cart = match db.add_cart_item(uid, item).await {
        Ok(cart) => cart,
        Err(e) => match e.downcast_ref::<CartError>() {
            Some(e) => {
                println!("{e}");
                return Ok(())
            },
            None => return Err(e),
        },
    };
    println!("{}", markup::format_cart(&cart));
    Ok(())
}

async fn place(
    db: &mut Db,
    uid: UserId,
    number: String,
    shipping: ShippingArgs,
) -> HandlerResult {
    let shipping = ShippingInfo::or_placeholders(
        shipping.ship_name, shipping.ship_address,
        shipping.ship_city, shipping.ship_phone);
    match cart::checkout(db, uid, &number, shipping).await {
        Ok(order) => println!("Order placed!\n{}", markup::format_order(&order)),
        Err(CartError::Store(e)) => return Err(e.into()),
        Err(e) => println!("{e}"),
    }
    Ok(())
}

async fn list(db: &mut Db, uid: UserId, history: bool) -> HandlerResult {
    let tab = if history { OrderTab::History } else { OrderTab::Active };
    let orders = db.orders_for_user(uid).await?;
    let shown = tab.filter(&orders);
    if shown.is_empty() {
        println!("No orders");
    }
    for order in shown {
        println!("{}", markup::format_order(order));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> HandlerResult {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()))
        .init();
    log::info!("Starting with {settings:?}");

    if let Command::Statuses = cli.command {
        print_statuses();
        return Ok(())
    }

    let mut db = open_db(&settings).await?;

    match cli.command {
        Command::Statuses => print_statuses(),
        Command::Options { caller, order } =>
            show_options(&mut db, caller, OrderId(order)).await?,
        Command::SetStatus { caller, order, status } =>
            set_status(&mut db, caller, OrderId(order), status).await?,
        Command::AdjustItem { caller, order, item, delta } =>
            adjust_item(&mut db, caller, OrderId(order), ItemId(item), delta).await?,
        Command::CartAdd { user, product, item } =>
            cart_add(&mut db, UserId(user), product, item).await?,
        Command::Cart { user } => {
            let cart = db.cart(UserId(user)).await?;
            println!("{}", markup::format_cart(&cart));
        },
        Command::Place { user, number, shipping } =>
            place(&mut db, UserId(user), number, shipping).await?,
        Command::List { user, history } =>
            list(&mut db, UserId(user), history).await?,
        Command::SetRole { user, role } => {
            db.set_profile_role(UserId(user), role).await?;
            println!("User {user} is now {role}");
        },
        Command::Stats => println!("{}", db.debug_stats().await?),
    }
    Ok(())
}
