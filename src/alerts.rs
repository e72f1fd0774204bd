//! Telegram alerts for the IPZS catalog.
//!
//! Each notifier only records a product as handled after its message was
//! delivered, so an unreachable Telegram API means a retry on the next run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Weekday};
use tracing::info;

use crate::ipzs::Coin;
use crate::telegram::Notifier;

/// Minimum number of coins released on the same day before that day is announced.
const RELEASE_CLUSTER: usize = 3;
const RELEASE_ALERT_HOUR: u32 = 8;
const PING_HOUR: u32 = 11;

pub async fn notify_new<N: Notifier>(notifier: &N, coins: &[Coin], seen: &mut BTreeSet<String>) {
    for coin in coins {
        if seen.contains(&coin.url) {
            continue;
        }
        let msg = format!(
            "<b>Nuova moneta</b>\n{}\n{}\n{}",
            coin.name, coin.price, coin.url
        );
        if notifier.send(&msg).await {
            info!(url = %coin.url, "announced new coin");
            seen.insert(coin.url.clone());
        }
    }
}

pub async fn notify_low<N: Notifier>(
    notifier: &N,
    coins: &[Coin],
    threshold: u64,
    alerted: &mut BTreeSet<String>,
) {
    for coin in coins {
        let low = matches!(coin.mintage(), Some(m) if m > 0 && m <= threshold);
        if !low || coin.is_sold_out() || alerted.contains(&coin.url) {
            continue;
        }
        let msg = format!(
            "<b>Moneta a bassa tiratura</b>\n\
             - NOME MONETA: {}\n\
             - PREZZO: {}\n\
             - CONTINGENTE: {}\n\
             - DISPONIBILITA: {}\n\
             - METALLO: {} ({} gr, {})\n\
             - IN VENDITA DA: {}\n\
             - LINK: {}",
            coin.name,
            coin.price,
            coin.mintage,
            coin.availability,
            coin.metal,
            coin.weight,
            coin.finish,
            coin.on_sale_since,
            coin.url
        );
        if notifier.send(&msg).await {
            info!(url = %coin.url, mintage = %coin.mintage, "low mintage alert sent");
            alerted.insert(coin.url.clone());
        }
    }
}

/// Announces tomorrow's releases once per day, from 08:00, when enough coins share the date.
pub async fn notify_dates<N: Notifier>(
    notifier: &N,
    coins: &[Coin],
    now: NaiveDateTime,
    alerts: &mut BTreeMap<String, String>,
) {
    let mut by_date: BTreeMap<NaiveDate, Vec<&Coin>> = BTreeMap::new();
    for coin in coins {
        if let Some(date) = coin.release_date() {
            by_date.entry(date).or_default().push(coin);
        }
    }

    let today = now.date();
    let tomorrow = today + TimeDelta::days(1);
    let Some(batch) = by_date.get(&tomorrow) else {
        return;
    };
    if batch.len() < RELEASE_CLUSTER || now.hour() < RELEASE_ALERT_HOUR {
        return;
    }

    let key = tomorrow.to_string();
    let today = today.to_string();
    if alerts.get(&key) == Some(&today) {
        return;
    }

    let names: Vec<String> = batch.iter().map(|c| format!("- {}", c.name)).collect();
    let msg = format!(
        "<b>{} monete disponibili il {}</b>\n{}",
        batch.len(),
        key,
        names.join("\n")
    );
    if notifier.send(&msg).await {
        info!(date = %key, coins = batch.len(), "release day alert sent");
        alerts.insert(key, today);
    }
}

/// Weekly liveness message, Sundays at 11.
pub async fn sunday_ping<N: Notifier>(notifier: &N, now: NaiveDateTime) {
    if now.weekday() == Weekday::Sun && now.hour() == PING_HOUR {
        notifier.send("🔁 Check domenicale: bot attivo").await;
    }
}
