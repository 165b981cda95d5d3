//! Chart generation and rendering for the dashboard.
//!
//! The overview chart plots income against expenses for every day of the
//! current month. It consumes the dense calendar series directly, so days
//! without transactions render as zero instead of gaps. The chart is
//! generated as JSON configuration for the ECharts library and rendered with
//! an HTML container and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger,
    },
    series::Line,
};
use maud::{Markup, PreEscaped, html};

use crate::{html::HeadElement, transaction::SeriesPoint};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML container for a dashboard chart.
pub(super) fn chart_view(chart: &DashboardChart) -> Markup {
    html!(
        div
            id=(chart.id)
            class="min-h-[380px] rounded dark:bg-gray-100"
        {}
    )
}

/// Generates JavaScript initialization code for a dashboard chart.
///
/// Creates a script that initializes the ECharts instance with dark mode
/// support and responsive resizing.
pub(super) fn chart_script(chart: &DashboardChart) -> HeadElement {
    let script_content = format!(
        r#"(function() {{
            const chartDom = document.getElementById("{}");
            const chart = echarts.init(chartDom);
            const option = {};
            chart.setOption(option);

            window.addEventListener('resize', chart.resize);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                const isDarkMode = darkModeMediaQuery.matches;
                chart.setTheme(isDarkMode ? 'dark' : 'default');
            }}
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }})();"#,
        chart.id, chart.options
    );

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// The income-vs-expense line chart over the dense series of the current
/// month.
pub(super) fn month_overview_chart(series: &[SeriesPoint]) -> Chart {
    let labels: Vec<String> = series.iter().map(|point| point.date.to_string()).collect();
    let income: Vec<f64> = series.iter().map(|point| point.income).collect();
    let expense: Vec<f64> = series.iter().map(|point| point.expense).collect();

    Chart::new()
        .title(Title::new().text("Transaction Overview").subtext("This month"))
        .tooltip(currency_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Income").data(income))
        .series(Line::new().name("Expense").data(expense))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
