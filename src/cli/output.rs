use serde_json::Value;

use crate::identity::Identity;
use crate::realtime::HubEvent;
use crate::routes::Navigation;
use crate::ui::Notice;

const MAX_COL_WIDTH: usize = 60;

// Render rows as an ASCII table. Numeric-looking cells are right aligned.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().min(MAX_COL_WIDTH)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(widths.len()) {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = vec![sep.clone(), build_row(&header, &widths), sep.clone()];
    out.extend(rows.iter().map(|r| build_row(r, &widths)));
    out.push(sep);
    out.join("\n")
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(text.chars().count()));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty()
        && st.chars().any(|c| c.is_ascii_digit())
        && st.chars().all(|c| c.is_ascii_digit() || ".-+,_".contains(c))
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn print_identity(identity: &Identity) {
    let rows = vec![
        vec!["id".to_string(), identity.id.clone()],
        vec!["name".to_string(), identity.full_name.clone()],
        vec!["phone".to_string(), identity.phone_number.clone()],
        vec!["email".to_string(), identity.email.clone().unwrap_or_default()],
        vec!["role".to_string(), identity.role.to_string()],
    ];
    println!("{}", render_table(&["field", "value"], &rows));
}

pub fn print_notices(notices: &[Notice]) {
    for n in notices {
        eprintln!("[{}] {}", n.severity, n.message);
    }
}

pub fn print_navigation(nav: &Navigation) {
    match nav {
        Navigation::Render(m) => {
            println!("render {:?} at {}", m.route.screen, m.path);
            if !m.params.is_empty() {
                let rows: Vec<Vec<String>> = m.params.iter().map(|(k, v)| vec![k.to_string(), v.clone()]).collect();
                println!("{}", render_table(&["param", "value"], &rows));
            }
        }
        Navigation::Redirect(r) => match &r.from {
            Some(from) => println!("redirect to {} (from {})", r.to, from),
            None => println!("redirect to {}", r.to),
        },
        Navigation::NotFound(path) => println!("not found: {}", path),
    }
}

/// One line per event; object arguments become a key/value table.
pub fn print_event(event: &HubEvent) {
    match event {
        HubEvent::Connected => println!("hub: connected"),
        HubEvent::Reconnecting { attempt, delay } => println!("hub: reconnecting (attempt {}, in {} ms)", attempt, delay.as_millis()),
        HubEvent::Disconnected { reason: Some(r) } => println!("hub: disconnected: {}", r),
        HubEvent::Disconnected { reason: None } => println!("hub: disconnected"),
        HubEvent::NewOrder { arguments, received_at } => {
            println!("new order notification at {}", received_at.format("%Y-%m-%d %H:%M:%S UTC"));
            for arg in arguments {
                match arg {
                    Value::Object(map) => {
                        let mut keys: Vec<&String> = map.keys().collect();
                        keys.sort();
                        let rows: Vec<Vec<String>> = keys.into_iter().map(|k| vec![k.clone(), cell(&map[k])]).collect();
                        println!("{}", render_table(&["field", "value"], &rows));
                    }
                    other => println!("  {}", cell(other)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_layout() {
        let t = render_table(&["field", "value"], &[vec!["id".into(), "42".into()], vec!["name".into(), "Nile".into()]]);
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "+-------+-------+");
        assert_eq!(lines[1], "| field | value |");
        assert_eq!(lines[3], "| id    |    42 |");
        assert_eq!(lines[4], "| name  | Nile  |");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(100);
        let t = render_table(&["v"], &[vec![long]]);
        let row = t.lines().nth(3).unwrap();
        assert!(row.contains('…'));
        assert_eq!(row.chars().count(), MAX_COL_WIDTH + 4);
    }
}
