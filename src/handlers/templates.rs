//! User-visible texts and keyboards
//!
//! Anything that embeds user-supplied text in a Markdown message goes through
//! [`escape_markdown`] first.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::value_objects::{
    Button, ChatId, Order, OutboundMessage, Role, SelectionTag, Specialization, User,
};

const MARKUP_CHARS: [char; 8] = ['\\', '_', '*', '[', ']', '(', ')', '`'];

/// Prefix every Markdown control character with a backslash
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKUP_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render `at` with a strftime pattern, falling back to RFC 3339 if the pattern is invalid
pub fn format_timestamp(at: DateTime<Utc>, pattern: &str) -> String {
    let mut rendered = String::new();
    match write!(rendered, "{}", at.format(pattern)) {
        Ok(()) => rendered,
        Err(_) => at.to_rfc3339(),
    }
}

fn specialization_row(tag: fn(Specialization) -> SelectionTag) -> Vec<Button> {
    Specialization::ALL
        .iter()
        .map(|&spec| {
            let icon = match spec {
                Specialization::Videographer => "🎥",
                Specialization::Photographer => "📸",
            };
            Button::callback(format!("{icon} {}", spec.label()), tag(spec))
        })
        .collect()
}

fn specialization_menu() -> String {
    Specialization::ALL
        .iter()
        .map(|spec| format!("- {} - {}", spec.label(), spec.blurb()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "👋 Welcome to LensHub!\n\n\
         We connect talented photographers and videographers with customers.\n\n\
         Choose your role to get started:",
    )
    .with_row(vec![
        Button::callback("🤝 I'm a customer", SelectionTag::RoleCustomer),
        Button::callback("📸 I'm a provider", SelectionTag::RoleExecutor),
    ])
}

pub fn profile_card(user: &User) -> OutboundMessage {
    let name = escape_markdown(&user.name);
    let handle = escape_markdown(&user.handle);
    match user.role {
        Role::Customer => OutboundMessage::markdown(
            user.chat_id.clone(),
            format!(
                "👤 *Your profile*\n\n\
                 📋 *Role:* {}\n\
                 👤 *Name:* {name}\n\
                 🔍 *Username:* @{handle}\n\n\
                 What would you like to do?",
                Role::Customer.label()
            ),
        )
        .with_row(vec![Button::callback("📝 Create order", SelectionTag::CreateOrder)]),
        Role::Provider => {
            let specialization = user.specialization.map_or("-", Specialization::label);
            let card = OutboundMessage::markdown(
                user.chat_id.clone(),
                format!(
                    "👤 *Your profile*\n\n\
                     📸 *Role:* {}\n\
                     👤 *Name:* {name}\n\
                     🔍 *Username:* @{handle}\n\
                     🎯 *Specialization:* {specialization}\n\n\
                     New orders matching your specialization will arrive here.",
                    Role::Provider.label()
                ),
            );
            match &user.portfolio {
                Some(url) => card.with_row(vec![Button::url("🎨 My portfolio", url.clone())]),
                None => card,
            }
        }
    }
}

pub fn registration_success(user: &User) -> OutboundMessage {
    let text = match user.role {
        Role::Customer => format!(
            "✅ Registration complete!\n\n\
             🤝 Welcome to the customers, {}!\n\n\
             You can now:\n\
             - Create new orders\n\
             - Receive responses from providers",
            user.name
        ),
        Role::Provider => format!(
            "✅ Registration complete!\n\n\
             🎨 Welcome to the providers, {}!\n\n\
             Your specialization: {}\n\n\
             You can now:\n\
             - Receive new orders\n\
             - Respond to the ones you like",
            user.name,
            user.specialization.map_or("-", Specialization::label)
        ),
    };
    OutboundMessage::plain(user.chat_id.clone(), text)
}

pub fn portfolio_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "📸 To finish registering, send a link to your portfolio.\n\n\
         It can be an Instagram page, a personal site, a cloud folder \
         or any other place that shows your work.",
    )
}

pub fn specialization_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        format!("🎯 Choose your specialization:\n\n{}", specialization_menu()),
    )
    .with_row(specialization_row(SelectionTag::Specialization))
}

pub fn order_specialization_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        format!(
            "🎯 Which kind of specialist does your order need?\n\n{}",
            specialization_menu()
        ),
    )
    .with_row(specialization_row(SelectionTag::OrderSpecialization))
}

pub fn title_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "📝 Great! Now enter a title for the order.\n\
         For example: \"Wedding photo session\" or \"Birthday video\"",
    )
}

pub fn description_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "📝 Now describe the order:\n\n\
         - What exactly needs to be done\n\
         - When the shoot is planned\n\
         - Any special wishes or requirements",
    )
}

pub fn location_prompt(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "📍 Where will the shoot take place?\n\n\
         For example: \"Almaty, Gorky park\" or \"Studio at Abay 150\"",
    )
}

pub fn order_created(order: &Order) -> OutboundMessage {
    OutboundMessage::markdown(
        order.customer.chat_id.clone(),
        format!(
            "✅ Order created!\n\n\
             📋 *{}*\n\
             📝 {}\n\
             📍 {}\n\n\
             We will let matching providers know about it.",
            escape_markdown(&order.title),
            escape_markdown(&order.description),
            escape_markdown(&order.location),
        ),
    )
}

/// New-order notice for one provider, carrying the response token
pub fn provider_notification(order: &Order, provider: &User, timestamp_format: &str) -> OutboundMessage {
    OutboundMessage::markdown(
        provider.chat_id.clone(),
        format!(
            "🆕 New order!\n\n\
             📋 *{}*\n\
             🎯 Specialization: *{}*\n\
             📝 {}\n\
             📍 {}\n\
             🕒 {}\n\n\
             Interested in this order?",
            escape_markdown(&order.title),
            order.specialization.label(),
            escape_markdown(&order.description),
            escape_markdown(&order.location),
            format_timestamp(order.created_at, timestamp_format),
        ),
    )
    .with_row(vec![Button::callback(
        "✅ Respond",
        SelectionTag::RespondToOrder(order.id),
    )])
}

pub fn response_acknowledged(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "✅ Your response has been sent!\n\n\
         The customer will receive your profile and contact you directly.",
    )
}

/// Provider profile sent to the customer who owns `order`
pub fn profile_exchange(order: &Order, provider: &User) -> OutboundMessage {
    let specialization = provider.specialization.map_or("-", Specialization::label);
    let portfolio = provider.portfolio.as_deref().unwrap_or("-");
    let message = OutboundMessage::markdown(
        order.customer.chat_id.clone(),
        format!(
            "🔔 New response to your order *\"{}\"*, you can now contact the provider directly!\n\n\
             👤 *Provider profile:*\n\
             📸 *Role:* {}\n\
             👤 *Name:* {}\n\
             🔍 *Username:* @{}\n\
             🎯 *Specialization:* {}\n\
             🎨 *Portfolio:* {}",
            escape_markdown(&order.title),
            escape_markdown(provider.role.label()),
            escape_markdown(&provider.name),
            escape_markdown(&provider.handle),
            escape_markdown(specialization),
            escape_markdown(portfolio),
        ),
    );
    match &provider.portfolio {
        Some(url) => message.with_row(vec![Button::url("🎨 Provider portfolio", url.clone())]),
        None => message,
    }
}

pub fn registration_failed(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "❌ Registration failed. Please try again or contact support.",
    )
}

pub fn order_failed(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "❌ Something went wrong while creating the order. Please send the location again.",
    )
}

pub fn response_failed(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(chat_id, "❌ Something went wrong. Please try again later.")
}

pub fn lookup_failed(chat_id: ChatId) -> OutboundMessage {
    OutboundMessage::plain(
        chat_id,
        "❌ We could not load your profile right now. Please send /start again in a moment.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{OrderId, UserId};
    use chrono::TimeZone;

    fn provider(name: &str) -> User {
        User {
            id: UserId(2),
            chat_id: ChatId::new("200"),
            name: name.to_string(),
            handle: "shooter_01".to_string(),
            role: Role::Provider,
            portfolio: Some("https://example.com/p".to_string()),
            specialization: Some(Specialization::Photographer),
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId(9),
            title: "Wedding".to_string(),
            description: "Full day".to_string(),
            location: "Almaty".to_string(),
            specialization: Specialization::Photographer,
            created_at: Utc.with_ymd_and_hms(2024, 5, 3, 14, 30, 0).unwrap(),
            customer: User {
                id: UserId(1),
                chat_id: ChatId::new("100"),
                name: "Dana".to_string(),
                handle: "dana".to_string(),
                role: Role::Customer,
                portfolio: None,
                specialization: None,
            },
        }
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c[d]e(f)g`h"), "a\\_b\\*c\\[d\\]e\\(f\\)g\\`h");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }

    #[test]
    fn test_escape_markdown_escapes_backslash_first() {
        // a user-typed backslash must not swallow the escape of the next char
        assert_eq!(escape_markdown(r"a\*b"), r"a\\\*b");
    }

    #[test]
    fn test_timestamp_uses_pattern() {
        let at = Utc.with_ymd_and_hms(2024, 5, 3, 14, 30, 0).unwrap();
        assert_eq!(format_timestamp(at, "%d.%m.%Y %H:%M"), "03.05.2024 14:30");
        assert_eq!(format_timestamp(at, "%Q"), at.to_rfc3339());
    }

    #[test]
    fn test_provider_notification_carries_response_token() {
        let message = provider_notification(&order(), &provider("Ann"), "%d.%m.%Y %H:%M");
        assert_eq!(message.chat_id, ChatId::new("200"));
        assert_eq!(message.callback_tags(), vec![SelectionTag::RespondToOrder(OrderId(9))]);
        assert!(message.text.contains("03.05.2024 14:30"));
    }

    #[test]
    fn test_profile_exchange_escapes_order_title() {
        let mut order = order();
        order.title = "Shoot *now* [a](b)".to_string();

        let message = profile_exchange(&order, &provider("Ann"));
        assert!(
            message
                .text
                .contains(r#"*"Shoot \*now\* \[a\]\(b\)"*"#)
        );
        assert!(!message.text.contains("*now*"));
    }

    #[test]
    fn test_profile_exchange_escapes_provider_fields() {
        let message = profile_exchange(&order(), &provider("*_[]()`"));
        assert!(message.text.contains("\\*\\_\\[\\]\\(\\)\\`"));
        assert!(message.text.contains("@shooter\\_01"));
        assert_eq!(message.chat_id, ChatId::new("100"));
    }
}
