//! Render archive path templates: strftime fields plus named integer placeholders.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};

use crate::{cycle::CycleTime, errors::FetchErr};

/// Render `template` for `time`, filling `{name}` or `{name:0N}` placeholders from `fields`.
///
/// Placeholders are replaced before the strftime pass, so their values never reach the date
/// formatter. Any malformed placeholder or strftime field is a `LocatorTemplateError`.
pub(crate) fn render(
    template: &str,
    time: CycleTime,
    fields: &[(&str, u32)],
) -> Result<String, FetchErr> {
    let substituted = substitute(template, fields)?;

    let items: Vec<Item> = StrftimeItems::new(&substituted).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FetchErr::template(template, "invalid strftime field"));
    }

    let mut out = String::with_capacity(substituted.len() + 16);
    write!(out, "{}", time.datetime().format_with_items(items.iter()))
        .map_err(|_| FetchErr::template(template, "strftime field not available for a cycle time"))?;

    Ok(out)
}

fn substitute(template: &str, fields: &[(&str, u32)]) -> Result<String, FetchErr> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);

        if tail.starts_with('}') {
            return Err(FetchErr::template(template, "unmatched '}'"));
        }

        let close = tail
            .find('}')
            .ok_or_else(|| FetchErr::template(template, "unclosed '{'"))?;
        let placeholder = &tail[1..close];

        let (name, spec) = match placeholder.split_once(':') {
            Some((name, spec)) => (name, spec.trim_end_matches('d')),
            None => (placeholder, ""),
        };

        let value = fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|&(_, value)| value)
            .ok_or_else(|| FetchErr::template(template, format!("unknown field {:?}", name)))?;

        let written = if spec.is_empty() {
            write!(out, "{}", value)
        } else {
            let width: usize = spec
                .strip_prefix('0')
                .and_then(|w| w.parse().ok())
                .ok_or_else(|| FetchErr::template(template, format!("bad width {:?}", spec)))?;
            write!(out, "{:0width$}", value, width = width)
        };
        written.map_err(|_| FetchErr::template(template, "formatting failed"))?;

        rest = &tail[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    fn t(s: &str) -> CycleTime {
        CycleTime::parse(s).unwrap()
    }

    #[test]
    fn test_strftime_only() {
        let out = render("rh%Y/%Y%m/%Y%m%d/gfs.%Y%m%d_%H.tar", t("2021010106"), &[]).unwrap();
        assert_eq!(out, "rh2021/202101/20210101/gfs.20210101_06.tar");
    }

    #[test]
    fn test_placeholders() {
        let out = render(
            "./enkfgdas.%Y%m%d/%H/mem{member:03}/gdas.t%Hz.atmf006.nemsio",
            t("2020123118"),
            &[("member", 7)],
        )
        .unwrap();
        assert_eq!(out, "./enkfgdas.20201231/18/mem007/gdas.t18z.atmf006.nemsio");

        let out = render("grp{group}.tar", t("2021010100"), &[("group", 8)]).unwrap();
        assert_eq!(out, "grp8.tar");

        let out = render("mem{member:03d}", t("2021010100"), &[("member", 42)]).unwrap();
        assert_eq!(out, "mem042");
    }

    #[test]
    fn test_template_errors() {
        let time = t("2021010100");
        for bad in &["{group", "group}", "{nope}", "{group:3}", "{group:0x}", "%Q", "%Z"] {
            match render(bad, time, &[("group", 1)]) {
                Err(FetchErr::LocatorTemplateError { template, .. }) => assert_eq!(&template, bad),
                other => panic!("{:?} gave {:?}", bad, other),
            }
        }
    }
}
