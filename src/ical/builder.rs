//! A module to build ICal files

use chrono::{DateTime, Utc};

use crate::calendar_object::{CalendarObject, Component, Property};

/// Content lines should not be longer than this many octets, excluding the line break (RFC5545 section 3.1)
const MAX_LINE_OCTETS: usize = 75;

/// Create an iCal file from a `crate::CalendarObject`
pub fn build_from(object: &CalendarObject) -> String {
    let mut out = String::new();
    write_component(&mut out, object.root());
    out
}

/// Format a date-time the way `DTSTAMP` expects it
pub fn format_date_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn write_component(out: &mut String, component: &Component) {
    write_folded(out, &format!("BEGIN:{}", component.name()));
    for property in component.properties() {
        write_folded(out, &content_line(property));
    }
    for child in component.components() {
        write_component(out, child);
    }
    write_folded(out, &format!("END:{}", component.name()));
}

fn content_line(property: &Property) -> String {
    let mut line = property.name().to_string();
    for (name, values) in property.params() {
        let values: Vec<String> = values.iter().map(|v| quote_param_value(v)).collect();
        line.push(';');
        line.push_str(name);
        line.push('=');
        line.push_str(&values.join(","));
    }
    line.push(':');
    line.push_str(property.value());
    line
}

fn quote_param_value(value: &str) -> String {
    if value.contains(|c| c == ':' || c == ';' || c == ',') {
        format!("\"{}\"", value.replace('"', ""))
    } else {
        value.to_string()
    }
}

/// Write a content line, folding it on UTF-8 character boundaries
fn write_folded(out: &mut String, line: &str) {
    let mut octets = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if octets + width > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            octets = 1;
        }
        out.push(c);
        octets += width;
    }
    out.push_str("\r\n");
}
