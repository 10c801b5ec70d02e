//! Inline SVG charts for the diary page

use chrono::{DateTime, Utc};

use moodmate_common::history::MoodTimeline;
use moodmate_common::{CanonicalEmotion, EmotionLabel};

use super::escape;

const WIDTH: f64 = 640.0;
const ROW_HEIGHT: f64 = 32.0;
const LEFT: f64 = 110.0;
const RIGHT: f64 = 20.0;
const TOP: f64 = 20.0;
const BOTTOM: f64 = 40.0;

/// Y-axis categories: the canonical emotions, then any unrecognized labels
/// in order of first appearance
pub fn categories(timeline: &MoodTimeline) -> Vec<EmotionLabel> {
    let mut categories: Vec<EmotionLabel> = CanonicalEmotion::ALL.iter().map(|&e| e.into()).collect();
    for (_, label) in timeline.points() {
        if !categories.contains(label) {
            categories.push(label.clone());
        }
    }
    categories
}

fn x_position(at: DateTime<Utc>, first: DateTime<Utc>, last: DateTime<Utc>) -> f64 {
    let span = (last - first).num_seconds();
    let plot_width = WIDTH - LEFT - RIGHT;
    if span <= 0 {
        return LEFT + plot_width / 2.0;
    }
    LEFT + plot_width * (at - first).num_seconds() as f64 / span as f64
}

/// Line chart of the diary's emotions over time
///
/// Returns `None` when no note carries a readable date.
pub fn mood_trend_svg(timeline: &MoodTimeline) -> Option<String> {
    let points: Vec<(DateTime<Utc>, &EmotionLabel)> = timeline.points().collect();
    let first = points.first()?.0;
    let last = points.last()?.0;

    let categories = categories(timeline);
    let height = TOP + BOTTOM + ROW_HEIGHT * categories.len() as f64;
    let y_of = |label: &EmotionLabel| {
        let row = categories.iter().position(|c| c == label).unwrap_or(0);
        // Row 0 at the bottom
        height - BOTTOM - ROW_HEIGHT * (row as f64 + 0.5)
    };

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w} {h}\" width=\"100%\" \
         role=\"img\" aria-label=\"Mood trend\" style=\"background:#242424;border-radius:8px\">",
        w = WIDTH,
        h = height
    );

    for label in &categories {
        let y = y_of(label);
        svg.push_str(&format!(
            "<line x1=\"{l}\" y1=\"{y:.1}\" x2=\"{r}\" y2=\"{y:.1}\" stroke=\"#3a3a3a\"/>\
             <text x=\"{tx}\" y=\"{ty:.1}\" fill=\"#aaa\" font-size=\"12\" text-anchor=\"end\">{name}</text>",
            l = LEFT,
            r = WIDTH - RIGHT,
            y = y,
            tx = LEFT - 8.0,
            ty = y + 4.0,
            name = escape(label.as_str()),
        ));
    }

    let coords: Vec<(f64, f64)> = points
        .iter()
        .map(|(at, label)| (x_position(*at, first, last), y_of(*label)))
        .collect();

    let path: Vec<String> = coords.iter().map(|(x, y)| format!("{:.1},{:.1}", x, y)).collect();
    svg.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"#4a9eff\" stroke-width=\"2\" points=\"{}\"/>",
        path.join(" ")
    ));

    for ((at, label), (x, y)) in points.iter().zip(&coords) {
        svg.push_str(&format!(
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"4\" fill=\"#4a9eff\"><title>{date}: {name}</title></circle>",
            x = x,
            y = y,
            date = at.format("%Y-%m-%d %H:%M"),
            name = escape(label.as_str()),
        ));
    }

    let axis_y = height - BOTTOM + 18.0;
    svg.push_str(&format!(
        "<text x=\"{l}\" y=\"{y}\" fill=\"#aaa\" font-size=\"12\">{first}</text>\
         <text x=\"{r}\" y=\"{y}\" fill=\"#aaa\" font-size=\"12\" text-anchor=\"end\">{last}</text>",
        l = LEFT,
        r = WIDTH - RIGHT,
        y = axis_y,
        first = first.format("%Y-%m-%d"),
        last = last.format("%Y-%m-%d"),
    ));
    svg.push_str("</svg>");
    Some(svg)
}

/// Horizontal bars of classifier confidences (percentages)
pub fn confidence_bars(ranked: &[(String, f64)]) -> String {
    ranked
        .iter()
        .map(|(label, pct)| {
            let pct = (*pct).clamp(0.0, 100.0);
            format!(
                "<div><span>{label}</span> <progress max=\"100\" value=\"{pct:.1}\"></progress> {pct:.1}%</div>",
                label = escape(&normalize_for_display(label)),
                pct = pct
            )
        })
        .collect()
}

fn normalize_for_display(raw: &str) -> String {
    moodmate_common::normalize(raw).decorated()
}
