use crate::DateTime;
use crate::cart::Cart;
use crate::order::{line_total, Order, OrderStatus};

pub fn format_money(cents: u64) -> String {
    if cents == 0 {
        return "Free".to_string()
    }

    format!("${}.{:02}", cents / 100, cents % 100)
}

/// Status as a badge, e.g. `[Ready #10b981]`
pub fn status_badge(status: OrderStatus) -> String {
    format!("[{} {}]", status.display_name(), status.color())
}

pub fn format_timestamp(t: DateTime) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// One order with its lines, as printed by the CLI
pub fn format_order(order: &Order) -> String {
    let id = order.id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut s = format!(
        "#{id} {} {} {} placed {}",
        order.order_number,
        status_badge(order.status),
        format_money(order.final_amount_cents),
        format_timestamp(order.created_at));
    for it in order.items.iter() {
        s.push_str(&format!(
            "\n    ({}) {} x{} = {}",
            it.id, it.product_name, it.quantity,
            format_money(it.total_price_cents)));
    }
    if let Some(ship) = &order.shipping {
        s.push_str(&format!(
            "\n    ship to {}, {}, {} ({})",
            ship.full_name, ship.address, ship.city, ship.phone));
    }
    s
}

pub fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Your cart is empty".to_string()
    }
    let mut s = String::new();
    for it in cart.items.iter() {
        let total = line_total(it.product_price_cents, it.quantity)
            .map(format_money)
            .unwrap_or_else(|| "too much".to_string());
        s.push_str(&format!("[{}] {} x{} = {}\n",
                            it.product_id, it.product_name, it.quantity, total));
    }
    match cart.total_cents() {
        Some(total) => s.push_str(&format!("Total: {}", format_money(total))),
        None => s.push_str("Total: too much"),
    }
    s
}
