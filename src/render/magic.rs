//! Magic words: `{{CURRENTYEAR}}`, `{{PAGENAME}}`, `{{SITENAME}}` and
//! friends.

use std::collections::HashMap;
use std::sync::LazyLock;

use time::OffsetDateTime;

use super::escape::encode_for_url;
use crate::context::RenderContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Utc,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Day,
    Day2,
    DayName,
    DayOfWeek,
    Month,
    MonthAbbrev,
    MonthName,
    Time,
    Hour,
    Week,
    Year,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageField {
    FullPageName,
    PageName,
    SubPageName,
    BasePageName,
    Namespace,
    TalkSpace,
    SubjectSpace,
    TalkPageName,
    SubjectPageName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MagicWord {
    Date(Clock, DateField),
    /// Page name derivative; `true` for the URL-encoded `...E` form.
    Page(PageField, bool),
    SiteName,
    Server,
    ServerName,
    ScriptPath,
    Version,
    /// Known but without a value here (statistics, revision data).
    Unsupported,
}

const DATE_FIELDS: &[(&str, DateField)] = &[
    ("DAY", DateField::Day),
    ("DAY2", DateField::Day2),
    ("DAYNAME", DateField::DayName),
    ("DOW", DateField::DayOfWeek),
    ("MONTH", DateField::Month),
    ("MONTHABBREV", DateField::MonthAbbrev),
    ("MONTHNAME", DateField::MonthName),
    ("TIME", DateField::Time),
    ("HOUR", DateField::Hour),
    ("WEEK", DateField::Week),
    ("YEAR", DateField::Year),
    ("TIMESTAMP", DateField::Timestamp),
];

const PAGE_FIELDS: &[(&str, PageField)] = &[
    ("FULLPAGENAME", PageField::FullPageName),
    ("PAGENAME", PageField::PageName),
    ("SUBPAGENAME", PageField::SubPageName),
    ("BASEPAGENAME", PageField::BasePageName),
    ("NAMESPACE", PageField::Namespace),
    ("TALKSPACE", PageField::TalkSpace),
    ("SUBJECTSPACE", PageField::SubjectSpace),
    ("ARTICLESPACE", PageField::SubjectSpace),
    ("TALKPAGENAME", PageField::TalkPageName),
    ("SUBJECTPAGENAME", PageField::SubjectPageName),
    ("ARTICLEPAGENAME", PageField::SubjectPageName),
];

const UNSUPPORTED: &[&str] = &[
    "NUMBEROFARTICLES",
    "NUMBEROFARTICLES:R",
    "NUMBEROFPAGES",
    "NUMBEROFPAGES:R",
    "NUMBEROFFILES",
    "NUMBEROFFILES:R",
    "NUMBEROFUSERS",
    "NUMBEROFUSERS:R",
    "NUMBEROFADMINS",
    "NUMBEROFADMINS:R",
    "PAGESINNAMESPACE",
    "PAGESINNS:ns",
    "PAGESINNS:ns:R",
    "REVISIONID",
    "REVISIONDAY",
    "REVISIONDAY2",
    "REVISIONMONTH",
    "REVISIONYEAR",
    "REVISIONTIMESTAMP",
];

static MAGIC_WORDS: LazyLock<HashMap<String, MagicWord>> = LazyLock::new(|| {
    let mut words = HashMap::new();
    for (prefix, clock) in [("CURRENT", Clock::Utc), ("LOCAL", Clock::Local)] {
        for &(suffix, field) in DATE_FIELDS {
            words.insert(format!("{prefix}{suffix}"), MagicWord::Date(clock, field));
        }
    }
    for &(name, field) in PAGE_FIELDS {
        words.insert(name.to_string(), MagicWord::Page(field, false));
        words.insert(format!("{name}E"), MagicWord::Page(field, true));
    }
    for (name, word) in [
        ("SITENAME", MagicWord::SiteName),
        ("SERVER", MagicWord::Server),
        ("SERVERNAME", MagicWord::ServerName),
        ("SCRIPTPATH", MagicWord::ScriptPath),
        ("CURRENTVERSION", MagicWord::Version),
    ] {
        words.insert(name.to_string(), word);
    }
    for name in UNSUPPORTED {
        words.insert(name.to_string(), MagicWord::Unsupported);
    }
    words
});

/// True for a reserved keyword; matching is case-sensitive.
pub fn is_magic_word(name: &str) -> bool {
    MAGIC_WORDS.contains_key(name)
}

/// Value of a magic word, unescaped. Unknown and unsupported words evaluate
/// to their own name.
pub(crate) fn evaluate(ctx: &RenderContext<'_>, name: &str) -> String {
    let Some(&word) = MAGIC_WORDS.get(name) else {
        return name.to_string();
    };
    match word {
        MagicWord::Date(clock, field) => format_date(now(clock), field),
        MagicWord::Page(field, encoded) => {
            let value = page_value(ctx, field);
            if encoded {
                encode_for_url(&value)
            } else {
                value
            }
        }
        MagicWord::SiteName => ctx.config().site_name.clone(),
        MagicWord::Server => ctx.config().server.clone(),
        MagicWord::ServerName => server_name(&ctx.config().server).to_string(),
        MagicWord::ScriptPath => ctx.context_path.clone(),
        MagicWord::Version => ctx.config().version.clone(),
        MagicWord::Unsupported => name.to_string(),
    }
}

fn now(clock: Clock) -> OffsetDateTime {
    match clock {
        Clock::Utc => OffsetDateTime::now_utc(),
        // the local offset is unavailable in some multi-threaded processes.
        Clock::Local => OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
    }
}

fn format_date(dt: OffsetDateTime, field: DateField) -> String {
    match field {
        DateField::Day => dt.day().to_string(),
        DateField::Day2 => format!("{:02}", dt.day()),
        DateField::DayName => dt.weekday().to_string(),
        DateField::DayOfWeek => dt.weekday().number_days_from_sunday().to_string(),
        DateField::Month => format!("{:02}", u8::from(dt.month())),
        DateField::MonthAbbrev => dt.month().to_string().chars().take(3).collect(),
        DateField::MonthName => dt.month().to_string(),
        DateField::Time => format!("{:02}:{:02}", dt.hour(), dt.minute()),
        DateField::Hour => format!("{:02}", dt.hour()),
        DateField::Week => dt.iso_week().to_string(),
        DateField::Year => dt.year().to_string(),
        DateField::Timestamp => format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
    }
}

/// Namespace and article of the page being rendered. Only configured
/// namespaces split; `Foo: Bar` is an article in the main namespace.
fn split_page_name<'p>(ctx: &RenderContext<'_>, page: &'p str) -> (&'p str, &'p str) {
    match page.split_once(':') {
        Some((ns, article)) if ctx.config().is_namespace(ns.trim()) => (ns.trim(), article.trim()),
        _ => ("", page),
    }
}

fn page_value(ctx: &RenderContext<'_>, field: PageField) -> String {
    let page = ctx.page_name.as_str();
    let (ns, article) = split_page_name(ctx, page);
    let pair = ctx.config().namespace(ns);
    let talk_space = pair.map_or("", |p| p.comments.as_str());
    let subject_space = pair.map_or(ns, |p| p.main.as_str());
    let qualify = |space: &str| {
        if space.is_empty() {
            article.to_string()
        } else {
            format!("{space}:{article}")
        }
    };
    match field {
        PageField::FullPageName => page.to_string(),
        PageField::PageName => article.to_string(),
        PageField::SubPageName => article.rsplit_once('/').map_or(article, |(_, sub)| sub).to_string(),
        PageField::BasePageName => article.rsplit_once('/').map_or(article, |(base, _)| base).to_string(),
        PageField::Namespace => ns.to_string(),
        PageField::TalkSpace => talk_space.to_string(),
        PageField::SubjectSpace => subject_space.to_string(),
        PageField::TalkPageName if talk_space.is_empty() => page.to_string(),
        PageField::TalkPageName => qualify(talk_space),
        PageField::SubjectPageName => qualify(subject_space),
    }
}

/// Host part of a server URL such as `https://wiki.example.org:8080/`.
fn server_name(server: &str) -> &str {
    let rest = server.split_once("://").map_or(server, |(_, rest)| rest);
    let end = rest.find(['/', ':']).unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn eval(page: &str, name: &str) -> String {
        let store = MemoryStore::new();
        let ctx = RenderContext::new(&store, "en", page).with_context_path("/wiki");
        evaluate(&ctx, name)
    }

    #[test]
    fn vocabulary_is_case_sensitive() {
        assert!(is_magic_word("PAGENAME"));
        assert!(is_magic_word("LOCALTIMESTAMP"));
        assert!(is_magic_word("NUMBEROFPAGES:R"));
        assert!(!is_magic_word("pagename"));
        assert!(!is_magic_word("Welcome"));
    }

    #[test]
    fn page_name_family() {
        let page = "Help:Some/Sub page";
        assert_eq!(eval(page, "FULLPAGENAME"), "Help:Some/Sub page");
        assert_eq!(eval(page, "FULLPAGENAMEE"), "Help:Some/Sub_page");
        assert_eq!(eval(page, "PAGENAME"), "Some/Sub page");
        assert_eq!(eval(page, "SUBPAGENAME"), "Sub page");
        assert_eq!(eval(page, "BASEPAGENAME"), "Some");
        assert_eq!(eval(page, "NAMESPACE"), "Help");
        assert_eq!(eval(page, "TALKSPACE"), "Help comments");
        assert_eq!(eval(page, "TALKPAGENAME"), "Help comments:Some/Sub page");
        assert_eq!(eval(page, "SUBJECTPAGENAME"), "Help:Some/Sub page");
    }

    #[test]
    fn main_namespace_pages() {
        assert_eq!(eval("Main Page", "NAMESPACE"), "");
        assert_eq!(eval("Main Page", "TALKPAGENAME"), "Comments:Main Page");
        assert_eq!(eval("Main Page", "ARTICLEPAGENAME"), "Main Page");
        assert_eq!(eval("Odd: title", "PAGENAME"), "Odd: title");
    }

    #[test]
    fn site_values() {
        assert_eq!(eval("P", "SITENAME"), "wiki2html");
        assert_eq!(eval("P", "SERVERNAME"), "localhost");
        assert_eq!(eval("P", "SCRIPTPATH"), "/wiki");
        assert_eq!(eval("P", "CURRENTVERSION"), env!("CARGO_PKG_VERSION"));
        assert_eq!(eval("P", "NUMBEROFARTICLES"), "NUMBEROFARTICLES");
        assert_eq!(server_name("https://wiki.example.org:8080/x"), "wiki.example.org");
    }

    #[test]
    fn date_fields_have_expected_shape() {
        let year = eval("P", "CURRENTYEAR");
        assert_eq!(year.len(), 4);
        assert!(year.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(eval("P", "CURRENTTIMESTAMP").len(), 14);
        assert_eq!(eval("P", "LOCALMONTH").len(), 2);
        assert_eq!(eval("P", "CURRENTMONTHABBREV").len(), 3);
        let dow: u8 = eval("P", "CURRENTDOW").parse().unwrap();
        assert!(dow < 7);
    }

    #[test]
    fn fixed_date_formatting() {
        let dt = time::macros::datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_date(dt, DateField::Day), "5");
        assert_eq!(format_date(dt, DateField::Day2), "05");
        assert_eq!(format_date(dt, DateField::DayName), "Tuesday");
        assert_eq!(format_date(dt, DateField::DayOfWeek), "2");
        assert_eq!(format_date(dt, DateField::MonthName), "March");
        assert_eq!(format_date(dt, DateField::MonthAbbrev), "Mar");
        assert_eq!(format_date(dt, DateField::Time), "07:08");
        assert_eq!(format_date(dt, DateField::Week), "10");
        assert_eq!(format_date(dt, DateField::Timestamp), "20240305070809");
    }
}
