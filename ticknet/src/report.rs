use ticknet_core::NetworkStats;

const INNER: usize = 34;

fn row(label: &str, value: impl ToString) -> String {
    format!("║ {:<20}{:>12} ║", label, value.to_string())
}

fn section(title: &str) -> String {
    format!("║ {:<33}║", title)
}

fn rate(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Render the aggregate counters as a boxed report.
pub fn render(stats: &NetworkStats) -> String {
    let separator = format!("╠{}╣", "═".repeat(INNER));
    let mut lines = vec![
        format!("╔{}╗", "═".repeat(INNER)),
        format!("║{:^INNER$}║", "NETWORK REPORT"),
        separator.clone(),
        row("Tick:", stats.current_tick),
        row("Routers:", stats.total_routers),
        row("Terminals:", stats.total_terminals),
        separator.clone(),
        section("PACKETS"),
        row("  Generated:", stats.packets_generated),
        row("  Sent:", stats.packets_sent),
        row("  Delivered:", stats.packets_delivered),
        row("  Dropped:", stats.packets_dropped),
        row("  Timed out:", stats.packets_timed_out),
        row("  In flight:", stats.packets_in_flight),
        separator.clone(),
        section("PAGES"),
        row("  Created:", stats.pages_created),
        row("  Completed:", stats.pages_completed),
        row("  Dropped:", stats.pages_dropped),
        row("  Timed out:", stats.pages_timed_out),
        separator,
        section("RATES"),
        row("  Delivery rate:", rate(stats.delivery_rate())),
        row("  Success rate:", rate(stats.success_rate())),
        row("  Drop rate:", rate(stats.drop_rate())),
        format!("╚{}╝", "═".repeat(INNER)),
    ];
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_line_is_the_same_width() {
        let stats = NetworkStats {
            current_tick: 1_000,
            total_routers: 6,
            total_terminals: 18,
            packets_generated: 123_456,
            packets_delivered: 100_000,
            pages_created: 20_000,
            pages_completed: 15_000,
            ..NetworkStats::default()
        };

        let report = render(&stats);
        let widths: Vec<usize> = report
            .lines()
            .map(|line| line.chars().count())
            .collect();

        assert!(!widths.is_empty());
        assert!(widths.iter().all(|&w| w == INNER + 2), "{report}");
    }

    #[test]
    fn rates_render_as_percentages() {
        let stats = NetworkStats {
            packets_generated: 200,
            packets_delivered: 150,
            ..NetworkStats::default()
        };

        assert!(render(&stats).contains("75.0%"));
    }
}
