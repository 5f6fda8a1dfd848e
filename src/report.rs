//! Terminal tables for each view.

use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use fleet_analytics_engine::{
    idle::{
        IdleAnalysis,
        IdleGroup,
        IdleUnit,
    },
    metrics::PeriodDelta,
    revenue::{
        RevenueAnalysis,
        RevenueGroup,
    },
    BreakdownRow,
    Dimension,
    DimensionValue,
    FleetView,
    IdleView,
    InventoryRow,
    MatrixCell,
    RevenueView,
    Secondary,
    Status,
    Summary,
    TrendView,
};
use std::collections::BTreeSet;

const PLACEHOLDER: &str = "-";

fn new_table(title: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)]);
    table
}

fn header_row(table: &mut Table, columns: &[&str]) {
    table.add_row(
        columns
            .iter()
            .map(|column| Cell::new(column).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
}

fn label(name: &str) -> Cell {
    Cell::new(name).add_attribute(Attribute::Bold)
}

fn status_color(status: Option<Status>) -> Color {
    match status {
        Some(Status::Good) => Color::Green,
        Some(Status::Warning) => Color::Yellow,
        Some(Status::Critical) => Color::Red,
        None => Color::Reset,
    }
}

fn status_cell(status: Option<Status>) -> Cell {
    let text = status.map_or_else(|| PLACEHOLDER.to_string(), |status| status.to_string());
    Cell::new(text).fg(status_color(status))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |value| format!("{:.1}%", value * 100.0))
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |value| format!("${value:.2}"))
}

fn format_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        format!("{num}")
    }
}

fn pending(title: &str, data: &Secondary<impl Sized>) -> Option<String> {
    let unavailable = data.as_ref().err()?;
    let mut table = new_table(title);
    table.add_row(vec![Cell::new(format!("pending: {unavailable}")).fg(Color::Yellow)]);
    Some(format!("{table}\n"))
}

fn delta(delta: Option<&PeriodDelta>, as_percent: bool) -> String {
    let Some(delta) = delta else {
        return PLACEHOLDER.to_string();
    };
    let change = if as_percent {
        format!("{:+.1} pts", delta.delta * 100.0)
    } else {
        format!("{:+.2}", delta.delta)
    };
    format!("{change} ({} vs {})", delta.latest_period, delta.previous_period)
}

pub fn summary(summary: &Summary) -> String {
    let mut table = new_table("FLEET SUMMARY");
    table.add_row(vec![label("Total Units"), Cell::new(format_number(summary.total))]);
    table.add_row(vec![label("Leased"), Cell::new(format_number(summary.leased))]);
    table.add_row(vec![label("Available"), Cell::new(format_number(summary.available))]);
    table.add_row(vec![
        label("Utilization"),
        Cell::new(percent(summary.utilization)).fg(status_color(summary.status)),
    ]);

    match &summary.idle_summary {
        Ok(idle) => {
            table.add_row(vec![label("Idle Units"), Cell::new(format_number(idle.total_idle))]);
            table.add_row(vec![
                label("Avg Months Idle"),
                Cell::new(idle.avg_months_idle.map_or_else(|| PLACEHOLDER.to_string(), |m| format!("{m:.1}")))
                    .fg(status_color(idle.status)),
            ]);
            table.add_row(vec![label("Critical Idle (24+)"), Cell::new(idle.critical)]);
            table.add_row(vec![label("Never Leased"), Cell::new(idle.never_leased)]);
            table.add_row(vec![
                label("Monthly Opportunity Cost"),
                Cell::new(money(Some(idle.monthly_opportunity_cost))),
            ]);
        }
        Err(unavailable) => {
            table.add_row(vec![label("Idle"), Cell::new(format!("pending: {unavailable}")).fg(Color::Yellow)]);
        }
    }

    match &summary.revenue_summary {
        Ok(revenue) => {
            table.add_row(vec![label("Invoices"), Cell::new(format_number(revenue.invoices))]);
            table.add_row(vec![label("Avg Billed Rate"), Cell::new(money(revenue.avg_billed))]);
            table.add_row(vec![label("Avg Card Rate"), Cell::new(money(revenue.avg_card))]);
            table.add_row(vec![
                label("Avg Rate Variance"),
                Cell::new(percent(revenue.avg_variance_pct)).fg(status_color(revenue.status)),
            ]);
        }
        Err(unavailable) => {
            table.add_row(vec![label("Revenue"), Cell::new(format!("pending: {unavailable}")).fg(Color::Yellow)]);
        }
    }

    format!("{table}\n")
}

pub fn breakdown(
    title: &str,
    dimensions: &[Dimension],
    rows: &[BreakdownRow],
    status: impl Fn(Option<f64>) -> Option<Status>,
) -> String {
    let mut table = new_table(title);
    let mut columns: Vec<String> = dimensions.iter().map(|dim| dim.to_string().to_uppercase()).collect();
    columns.extend(["TOTAL", "LEASED", "UTILIZATION"].map(String::from));
    header_row(&mut table, &columns.iter().map(String::as_str).collect::<Vec<_>>());

    for row in rows {
        let mut cells: Vec<Cell> = row.values.iter().map(Cell::new).collect();
        cells.push(Cell::new(row.total));
        cells.push(Cell::new(row.leased));
        cells.push(Cell::new(percent(row.utilization)).fg(status_color(status(row.utilization))));
        table.add_row(cells);
    }
    format!("{table}\n")
}

/// Pivots sparse cells into a grid. Absent combinations render as blanks.
pub fn matrix(title: &str, cells: &[MatrixCell]) -> String {
    let rows: BTreeSet<&DimensionValue> = cells.iter().map(|cell| &cell.row).collect();
    let columns: BTreeSet<&DimensionValue> = cells.iter().map(|cell| &cell.column).collect();

    let mut table = new_table(title);
    let mut header = vec![Cell::new("")];
    header.extend(columns.iter().map(|column| Cell::new(column).add_attribute(Attribute::Bold)));
    table.add_row(header);

    for row in &rows {
        let mut line = vec![label(&row.to_string())];
        for column in &columns {
            let cell = cells
                .iter()
                .find(|cell| &cell.row == *row && &cell.column == *column);
            line.push(Cell::new(cell.map_or_else(String::new, |cell| {
                format!("{}/{} ({})", cell.leased, cell.total, percent(cell.utilization))
            })));
        }
        table.add_row(line);
    }
    format!("{table}\n")
}

pub fn fleet(view: &FleetView, status: impl Fn(Option<f64>) -> Option<Status> + Copy) -> String {
    let mut table = new_table("FLEET TOTALS");
    table.add_row(vec![label("Total Units"), Cell::new(view.totals.total)]);
    table.add_row(vec![label("Leased"), Cell::new(view.totals.leased)]);
    table.add_row(vec![label("Available"), Cell::new(view.totals.available)]);
    table.add_row(vec![label("Other Statuses"), Cell::new(view.totals.other)]);
    table.add_row(vec![
        label("Utilization"),
        Cell::new(percent(view.utilization)).fg(status_color(view.status)),
    ]);
    table.add_row(vec![label("Branches"), Cell::new(view.branches.join(", "))]);

    let mut out = format!("{table}\n");
    out.push_str(&breakdown("BY BRANCH", &[Dimension::Branch], &view.by_branch, status));
    out.push_str(&breakdown("BY TYPE", &[Dimension::Type], &view.by_type, status));
    out.push_str(&breakdown("BY USAGE", &[Dimension::Usage], &view.by_usage, status));
    out.push_str(&matrix("TYPE x USAGE", &view.type_usage));
    out
}

fn idle_groups(title: &str, groups: &[IdleGroup]) -> String {
    let mut table = new_table(title);
    header_row(
        &mut table,
        &["VALUE", "UNITS", "AVG MONTHS", "CRITICAL", "NEVER LEASED", "ASSET COST", "OPPORTUNITY"],
    );
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.value),
            Cell::new(group.units),
            Cell::new(group.avg_months_idle.map_or_else(|| PLACEHOLDER.to_string(), |m| format!("{m:.1}"))),
            Cell::new(group.critical).fg(if group.critical == 0 { Color::Green } else { Color::Red }),
            Cell::new(group.never_leased),
            Cell::new(money(Some(group.total_cost))),
            Cell::new(money(Some(group.opportunity_cost))),
        ]);
    }
    format!("{table}\n")
}

pub fn idle_units(title: &str, units: &[IdleUnit]) -> String {
    let mut table = new_table(title);
    header_row(
        &mut table,
        &["UNIT", "BRANCH", "TYPE", "USAGE", "LENGTH", "MONTHS IDLE", "LEASES", "COST", "CARD RATE"],
    );
    for unit in units {
        table.add_row(vec![
            Cell::new(&unit.unit),
            Cell::new(&unit.branch),
            Cell::new(&unit.type_bucket),
            Cell::new(&unit.usage),
            Cell::new(&unit.length),
            Cell::new(unit.months_idle).fg(if unit.bucket.is_critical() { Color::Red } else { Color::Reset }),
            Cell::new(unit.cumulative_leases),
            Cell::new(money(unit.asset_cost)),
            Cell::new(money(unit.card_rate)),
        ]);
    }
    format!("{table}\n")
}

fn idle_analysis(analysis: &IdleAnalysis) -> String {
    let summary = &analysis.summary;
    let mut table = new_table(&format!(
        "IDLE SUMMARY ({})",
        summary.period.as_deref().unwrap_or(PLACEHOLDER)
    ));
    table.add_row(vec![label("Idle Units"), Cell::new(summary.total_idle)]);
    table.add_row(vec![label("Idle Asset Cost"), Cell::new(money(Some(summary.total_idle_cost)))]);
    table.add_row(vec![
        label("Avg Months Idle"),
        Cell::new(summary.avg_months_idle.map_or_else(|| PLACEHOLDER.to_string(), |m| format!("{m:.1}"))),
    ]);
    table.add_row(vec![label("Status"), status_cell(summary.status)]);
    table.add_row(vec![
        label("Monthly Opportunity Cost"),
        Cell::new(money(Some(summary.monthly_opportunity_cost))),
    ]);
    table.add_row(vec![label("Never Leased"), Cell::new(summary.never_leased)]);
    table.add_row(vec![label("Critical (24+)"), Cell::new(summary.critical)]);

    let mut out = format!("{table}\n");
    out.push_str(&idle_groups("IDLE BY DURATION", &analysis.by_duration));
    out.push_str(&idle_groups("IDLE BY BRANCH", &analysis.by_branch));
    out.push_str(&idle_groups("IDLE BY TYPE", &analysis.by_type));
    out.push_str(&idle_groups("IDLE BY USAGE", &analysis.by_usage));

    let mut trend = new_table("IDLE TREND");
    header_row(&mut trend, &["PERIOD", "UNITS", "AVG MONTHS", "CRITICAL", "OPPORTUNITY"]);
    for point in &analysis.trend {
        trend.add_row(vec![
            Cell::new(&point.period),
            Cell::new(point.units),
            Cell::new(point.avg_months_idle.map_or_else(|| PLACEHOLDER.to_string(), |m| format!("{m:.1}"))),
            Cell::new(point.critical),
            Cell::new(money(Some(point.opportunity_cost))),
        ]);
    }
    out.push_str(&format!("{trend}\n"));
    out.push_str(&idle_units("CRITICAL IDLE UNITS", &analysis.critical));
    out
}

pub fn idle(view: &IdleView) -> String {
    let mut table = new_table("ACTIVE FLEET");
    table.add_row(vec![label("Total Units"), Cell::new(view.fleet.total)]);
    table.add_row(vec![label("Idle Share"), Cell::new(percent(view.idle_share))]);
    let mut out = format!("{table}\n");

    match &view.idle {
        Ok(analysis) => out.push_str(&idle_analysis(analysis)),
        Err(_) => out.push_str(&pending("IDLE ANALYSIS", &view.idle).unwrap_or_default()),
    }
    out
}

fn revenue_groups(title: &str, groups: &[RevenueGroup], status: impl Fn(Option<f64>) -> Option<Status>) -> String {
    let mut table = new_table(title);
    header_row(&mut table, &["VALUE", "INVOICES", "BILLED", "AVG BILLED", "AVG CARD", "VARIANCE"]);
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.value),
            Cell::new(group.invoices),
            Cell::new(money(Some(group.total_billed))),
            Cell::new(money(group.avg_billed)),
            Cell::new(money(group.avg_card)),
            Cell::new(percent(group.avg_variance_pct)).fg(status_color(status(group.avg_variance_pct))),
        ]);
    }
    format!("{table}\n")
}

fn revenue_analysis(analysis: &RevenueAnalysis, status: impl Fn(Option<f64>) -> Option<Status> + Copy) -> String {
    let summary = &analysis.summary;
    let mut table = new_table("REVENUE SUMMARY");
    table.add_row(vec![label("Invoices"), Cell::new(summary.invoices)]);
    table.add_row(vec![label("Total Billed"), Cell::new(money(Some(summary.total_billed)))]);
    table.add_row(vec![label("Avg Billed Rate"), Cell::new(money(summary.avg_billed))]);
    table.add_row(vec![label("Avg Card Rate"), Cell::new(money(summary.avg_card))]);
    table.add_row(vec![label("Avg Variance"), Cell::new(money(summary.avg_variance))]);
    table.add_row(vec![
        label("Avg Variance %"),
        Cell::new(percent(summary.avg_variance_pct)).fg(status_color(summary.status)),
    ]);
    table.add_row(vec![label("At or Above Card"), Cell::new(summary.at_or_above_card)]);
    table.add_row(vec![label("Below Card"), Cell::new(summary.below_card)]);
    table.add_row(vec![label("Without Card Rate"), Cell::new(summary.without_card_rate)]);
    table.add_row(vec![
        label("Avg Billed M-o-M"),
        Cell::new(delta(analysis.month_over_month.as_ref(), false)).fg(status_color(analysis.growth_status)),
    ]);

    let mut out = format!("{table}\n");
    out.push_str(&revenue_groups("REVENUE BY BRANCH", &analysis.by_branch, status));
    out.push_str(&revenue_groups("REVENUE BY TYPE", &analysis.by_type, status));
    out.push_str(&revenue_groups("REVENUE BY USAGE", &analysis.by_usage, status));

    let mut bands = new_table("RATE VARIANCE DISTRIBUTION");
    header_row(&mut bands, &["BAND", "INVOICES", "BILLED"]);
    for band in &analysis.variance_distribution {
        bands.add_row(vec![
            Cell::new(&band.band),
            Cell::new(band.invoices),
            Cell::new(money(Some(band.total_billed))),
        ]);
    }
    out.push_str(&format!("{bands}\n"));

    if !analysis.missing_card_rates.is_empty() {
        let mut missing = new_table("UNITS WITHOUT A CARD RATE");
        header_row(&mut missing, &["TYPE", "USAGE", "LENGTH", "UNITS", "REVENUE AT RISK"]);
        for row in &analysis.missing_card_rates {
            missing.add_row(vec![
                Cell::new(&row.type_bucket),
                Cell::new(&row.usage),
                Cell::new(&row.length),
                Cell::new(row.units),
                Cell::new(money(Some(row.revenue_at_risk))).fg(Color::Yellow),
            ]);
        }
        out.push_str(&format!("{missing}\n"));
    }

    let mut trend = new_table("REVENUE TREND");
    header_row(&mut trend, &["PERIOD", "INVOICES", "AVG BILLED", "AVG CARD", "VARIANCE"]);
    for point in &analysis.trend {
        trend.add_row(vec![
            Cell::new(&point.period),
            Cell::new(point.invoices),
            Cell::new(money(point.avg_billed)),
            Cell::new(money(point.avg_card)),
            Cell::new(percent(point.avg_variance_pct)),
        ]);
    }
    out.push_str(&format!("{trend}\n"));
    out
}

pub fn revenue(view: &RevenueView, status: impl Fn(Option<f64>) -> Option<Status> + Copy) -> String {
    match &view.revenue {
        Ok(analysis) => revenue_analysis(analysis, status),
        Err(_) => pending("REVENUE ANALYSIS", &view.revenue).unwrap_or_default(),
    }
}

pub fn trend(view: &TrendView, status: impl Fn(Option<f64>) -> Option<Status> + Copy) -> String {
    let mut out = breakdown(
        &format!("CURRENT UTILIZATION BY {}", view.dimension.to_string().to_uppercase()),
        &[view.dimension],
        &view.current,
        status,
    );

    if let Some(pending) = pending("UTILIZATION HISTORY", &view.history) {
        out.push_str(&pending);
        return out;
    }

    let mut table = new_table("UTILIZATION HISTORY");
    header_row(&mut table, &["VALUE", "PERIODS", "LATEST", "M-O-M"]);
    for series in view.series() {
        let periods = series
            .points
            .iter()
            .map(|point| format!("{} {}", point.period, percent(point.utilization)))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            label(&series.value),
            Cell::new(periods),
            Cell::new(percent(series.latest_utilization)).fg(status_color(status(series.latest_utilization))),
            Cell::new(delta(series.month_over_month.as_ref(), true)),
        ]);
    }
    out.push_str(&format!("{table}\n"));
    out
}

pub fn inventory(rows: &[InventoryRow]) -> String {
    let mut table = new_table("INVENTORY");
    header_row(
        &mut table,
        &["UNIT", "BRANCH", "STATUS", "TYPE", "BUCKET", "YEAR", "LENGTH", "USAGE", "COST"],
    );
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.unit),
            Cell::new(&row.branch),
            Cell::new(&row.status),
            Cell::new(row.raw_type.as_deref().unwrap_or(PLACEHOLDER)),
            Cell::new(&row.type_bucket),
            Cell::new(row.model_year.as_deref().unwrap_or(PLACEHOLDER)),
            Cell::new(&row.length_bucket),
            Cell::new(&row.usage),
            Cell::new(money(row.cost)),
        ]);
    }
    format!("{table}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_analytics_engine::{
        TypeBucket,
        UsageBucket,
    };

    #[test]
    fn formats_numbers_and_rates() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(12_500), "12.5K");
        assert_eq!(percent(Some(0.6)), "60.0%");
        assert_eq!(percent(None), "-");
        assert_eq!(money(Some(650.0)), "$650.00");
    }

    #[test]
    fn matrix_leaves_missing_cells_blank() {
        let cells = vec![
            MatrixCell {
                row: DimensionValue::Type(TypeBucket::DryVan),
                column: DimensionValue::Usage(UsageBucket::Otr0),
                total: 4,
                leased: 3,
                utilization: Some(0.75),
            },
            MatrixCell {
                row: DimensionValue::Type(TypeBucket::Specialty),
                column: DimensionValue::Usage(UsageBucket::Storage),
                total: 1,
                leased: 0,
                utilization: Some(0.0),
            },
        ];
        let rendered = matrix("TYPE x USAGE", &cells);
        assert!(rendered.contains("3/4 (75.0%)"));
        assert!(rendered.contains("0/1 (0.0%)"));
        assert!(rendered.contains("STORAGE"));
    }
}
