//! Server-rendered HTML pages.
//!
//! Every value that originates from a visitor goes through [`escape`].

use std::collections::BTreeMap;

use calc_core::calculations::{EstimateForm, EstimateResult};
use calc_core::errors::CalcError;
use calc_core::materials::MaterialCatalog;
use calc_core::session_log::LogRecord;
use calc_core::units::LengthUnit;

const CSS: &str = r#"
*{box-sizing:border-box}
body{font-family:system-ui,sans-serif;margin:0;background:#f6f7f9;color:#222}
nav{background:#2d4a3e;padding:.75rem 2rem;display:flex;gap:1.5rem}
nav a{color:#fff;text-decoration:none}nav a:hover{text-decoration:underline}
main{max-width:760px;margin:2rem auto;background:#fff;padding:2rem;border-radius:8px}
label{display:block;margin-top:.75rem;font-size:.9rem;color:#555}
input,select,textarea{width:100%;padding:.45rem;border:1px solid #ccc;border-radius:4px}
button{margin-top:1rem;background:#2d4a3e;color:#fff;border:0;padding:.6rem 1.2rem;border-radius:4px;cursor:pointer}
.error{background:#fde8e8;border:1px solid #e0a0a0;padding:.75rem;border-radius:4px;margin-bottom:1rem}
.success{background:#e6f4ea;border:1px solid #8cc79c;padding:.75rem;border-radius:4px;margin-bottom:1rem}
.hp{position:absolute;left:-9999px}
table{width:100%;border-collapse:collapse;margin-top:1rem}th,td{text-align:left;padding:.4rem;border-bottom:1px solid #eee}
"#;

/// Minimal HTML escaping for text and attribute values
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str, head_extra: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html lang="nl"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title} - Materiaalcalculator</title><style>{CSS}</style>{head_extra}</head>
<body><nav><a href="/">Calculator</a><a href="/mijn-berekeningen">Mijn berekeningen</a><a href="/contact">Contact</a><a href="/info">Info</a></nav>
<main>{body}</main></body></html>"#,
        title = escape(title),
    )
}

/// Dutch message shown to the visitor for a failed request
pub fn user_message(error: &CalcError) -> String {
    match error {
        CalcError::InvalidMaterial { .. } => "Onbekend materiaal geselecteerd.".to_string(),
        CalcError::InvalidNumericInput { field, .. } if field == "marge" => {
            "Ongeldige invoer voor marge.".to_string()
        }
        CalcError::InvalidNumericInput { .. } => {
            "Ongeldige invoer voor lengte, breedte, hoogte of helling.".to_string()
        }
        CalcError::ValidationError { field, reason } => match field.as_str() {
            "honeypot" => "Spam detectie: formulier ongeldig ingevuld.".to_string(),
            "email" | "message" if reason.ends_with("is required") => {
                "Zorg ervoor dat zowel e-mailadres als bericht zijn ingevuld.".to_string()
            }
            "email" => "Vul een geldig e-mailadres in.".to_string(),
            "message" => "Het bericht is te lang.".to_string(),
            "verification" => "Verificatie mislukt. Probeer het opnieuw.".to_string(),
            "datum" => "Ongeldige datum, gebruik JJJJMMDD.".to_string(),
            _ => "Ongeldige invoer.".to_string(),
        },
        CalcError::DeliveryError { reason } => format!("Verzenden mislukt: {}", reason),
        CalcError::CorruptLogEntry { .. } => "Je eerdere berekeningen konden niet worden gelezen.".to_string(),
        CalcError::FileError { .. } | CalcError::SerializationError { .. } => {
            "Je berekening kon niet worden opgeslagen.".to_string()
        }
        CalcError::Internal { .. } => "Er ging iets mis. Probeer het later opnieuw.".to_string(),
    }
}

fn notice(class: &str, text: &str) -> String {
    format!(r#"<div class="{}">{}</div>"#, class, escape(text))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string())
}

/// Calculator page state
pub struct CalculatorView<'a> {
    pub catalog: &'a MaterialCatalog,
    pub form: &'a EstimateForm,
    pub result: Option<&'a EstimateResult>,
    pub error: Option<String>,
}

pub fn calculator(view: &CalculatorView<'_>) -> String {
    let form = view.form;
    let value = |field: &Option<String>| escape(field.as_deref().unwrap_or(""));

    let selected_material = form.material.as_deref().unwrap_or("");
    let materials: String = view
        .catalog
        .names()
        .map(|name| {
            let selected = if name == selected_material { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, escape(name), selected)
        })
        .collect();

    let selected_unit = LengthUnit::from_symbol(form.unit.as_deref().unwrap_or("m"));
    let units: String = LengthUnit::ALL
        .iter()
        .map(|unit| {
            let selected = if *unit == selected_unit { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, unit.symbol(), selected)
        })
        .collect();

    let margin = form.margin_percent.as_deref().unwrap_or("5");

    let mut body = String::from("<h1>Materiaalcalculator</h1>");
    if let Some(error) = &view.error {
        body.push_str(&notice("error", error));
    }
    body.push_str(&format!(
        r#"<form method="post" action="/">
<label>Onderdeel<input name="onderdeel" value="{label}"></label>
<label>Materiaal<select name="materiaal">{materials}</select></label>
<label>Eenheid<select name="eenheid">{units}</select></label>
<label>Lengte<input name="lengte" value="{length}" required></label>
<label>Breedte<input name="breedte" value="{width}" required></label>
<label>Hoogte (optioneel)<input name="hoogte" value="{height}"></label>
<label>Helling in graden (optioneel)<input name="helling" value="{slope}"></label>
<label>Marge (%)<input name="marge" value="{margin}"></label>
<button type="submit">Bereken</button>
</form>"#,
        label = value(&form.label),
        length = value(&form.length),
        width = value(&form.width),
        height = value(&form.height),
        slope = value(&form.slope),
        margin = escape(margin),
    ));

    if let Some(result) = view.result {
        body.push_str(&result_table(result));
    }
    layout("Calculator", &body, "")
}

fn result_table(r: &EstimateResult) -> String {
    format!(
        r#"<h2>Resultaat{label}</h2><table>
<tr><th>Materiaal</th><td>{material}</td></tr>
<tr><th>Lengte</th><td>{length} m</td></tr>
<tr><th>Breedte</th><td>{width} m</td></tr>
<tr><th>Hoogte</th><td>{height}</td></tr>
<tr><th>Helling</th><td>{slope}</td></tr>
<tr><th>Marge</th><td>{margin}%</td></tr>
<tr><th>Oppervlakte</th><td>{area:.2} {unit}</td></tr>
<tr><th>Aantal</th><td>{quantity:.2}</td></tr>
<tr><th>Prijs</th><td>&euro; {price:.2}</td></tr>
</table>"#,
        label = r.label.as_deref().map(|l| format!(": {}", escape(l))).unwrap_or_default(),
        material = escape(&r.material),
        length = r.length,
        width = r.width,
        height = fmt_opt(r.height),
        slope = fmt_opt(r.slope),
        margin = r.margin_percent,
        area = r.area,
        unit = escape(&r.area_unit),
        quantity = r.quantity,
        price = r.price,
    )
}

/// History page state
pub enum HistoryView<'a> {
    NoSession,
    Records { date: String, records: &'a [LogRecord] },
    Failed(String),
}

pub fn history(view: &HistoryView<'_>) -> String {
    let mut body = String::from("<h1>Mijn berekeningen</h1>");
    match view {
        HistoryView::NoSession => {
            body.push_str("<p>Er is nog geen sessie gevonden. Maak eerst een berekening.</p>");
        }
        HistoryView::Failed(message) => body.push_str(&notice("error", message)),
        HistoryView::Records { date, records } if records.is_empty() => {
            body.push_str(&format!("<p>Geen berekeningen op {}.</p>", escape(date)));
        }
        HistoryView::Records { date, records } => {
            body.push_str(&format!("<p>Berekeningen op {}:</p>", escape(date)));
            body.push_str(
                "<table><tr><th>Tijd</th><th>Onderdeel</th><th>Materiaal</th><th>Oppervlakte</th><th>Aantal</th><th>Prijs</th></tr>",
            );
            for record in records.iter() {
                let r = &record.result;
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2} {}</td><td>{:.2}</td><td>&euro; {:.2}</td></tr>",
                    record.timestamp.format("%H:%M:%S"),
                    escape(r.label.as_deref().unwrap_or("-")),
                    escape(&r.material),
                    r.area,
                    escape(&r.area_unit),
                    r.quantity,
                    r.price,
                ));
            }
            body.push_str("</table>");
        }
    }
    layout("Mijn berekeningen", &body, "")
}

/// Contact page state
pub struct ContactView<'a> {
    pub success: bool,
    pub error: Option<String>,
    pub email: &'a str,
    pub message: &'a str,
    pub recaptcha_site_key: Option<&'a str>,
}

pub fn contact(view: &ContactView<'_>) -> String {
    let mut body = String::from("<h1>Contact</h1>");
    if view.success {
        body.push_str(&notice("success", "Bedankt! Je bericht is verzonden."));
    }
    if let Some(error) = &view.error {
        body.push_str(&notice("error", error));
    }

    let (widget, script) = match view.recaptcha_site_key {
        Some(key) => (
            format!(r#"<div class="g-recaptcha" data-sitekey="{}"></div>"#, escape(key)),
            r#"<script src="https://www.google.com/recaptcha/api.js" async defer></script>"#,
        ),
        None => (String::new(), ""),
    };

    body.push_str(&format!(
        r#"<form method="post" action="/contact">
<label>E-mailadres<input type="email" name="email" value="{email}" required></label>
<label>Bericht<textarea name="message" rows="6" required>{message}</textarea></label>
<div class="hp" aria-hidden="true"><label>Laat dit veld leeg<input name="honeypot" tabindex="-1" autocomplete="off"></label></div>
{widget}
<button type="submit">Verstuur</button>
</form>"#,
        email = escape(view.email),
        message = escape(view.message),
    ));
    layout("Contact", &body, script)
}

pub fn info(catalog: &MaterialCatalog, usage: &BTreeMap<String, u64>) -> String {
    let rows: String = catalog
        .entries()
        .iter()
        .map(|entry| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&entry.name),
                entry.unit_cost,
                usage.get(&entry.name).copied().unwrap_or(0)
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Info</h1>
<p>De calculator berekent de oppervlakte (lengte &times; breedte), de benodigde hoeveelheid
materiaal inclusief marge, en een prijsindicatie (hoeveelheid &times; 1,5).
Lengtes kunnen in millimeter, centimeter of meter worden ingevoerd.</p>
<p>Je berekeningen worden per sessie en per dag bewaard en zijn terug te vinden onder
<a href="/mijn-berekeningen">Mijn berekeningen</a>.</p>
<table><tr><th>Materiaal</th><th>Co&euml;ffici&euml;nt</th><th>Berekeningen</th></tr>{rows}</table>"#
    );
    layout("Info", &body, "")
}

pub fn not_found() -> String {
    layout("Niet gevonden", "<h1>404</h1><p>Deze pagina bestaat niet.</p>", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b a="x">&'"#), "&lt;b a=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("dak"), "dak");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            user_message(&CalcError::invalid_material("x")),
            "Onbekend materiaal geselecteerd."
        );
        assert_eq!(
            user_message(&CalcError::invalid_numeric_input("lengte", "a", "Not a number")),
            "Ongeldige invoer voor lengte, breedte, hoogte of helling."
        );
        assert_eq!(
            user_message(&CalcError::validation("honeypot", "filled")),
            "Spam detectie: formulier ongeldig ingevuld."
        );
        assert_eq!(
            user_message(&CalcError::validation("email", "Email address is required")),
            "Zorg ervoor dat zowel e-mailadres als bericht zijn ingevuld."
        );
        assert!(user_message(&CalcError::delivery("refused")).contains("refused"));
    }

    #[test]
    fn test_calculator_preserves_form_and_escapes() {
        let catalog = MaterialCatalog::default();
        let form = EstimateForm {
            label: Some("<script>".to_string()),
            material: Some("metaal".to_string()),
            length: Some("abc".to_string()),
            unit: Some("cm".to_string()),
            ..Default::default()
        };
        let html = calculator(&CalculatorView {
            catalog: &catalog,
            form: &form,
            result: None,
            error: Some("Ongeldige invoer".to_string()),
        });
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"<option value="metaal" selected>"#));
        assert!(html.contains(r#"<option value="cm" selected>"#));
        assert!(html.contains(r#"name="lengte" value="abc""#));
        assert!(html.contains("Ongeldige invoer"));
    }

    #[test]
    fn test_history_no_session() {
        let html = history(&HistoryView::NoSession);
        assert!(html.contains("geen sessie"));
    }

    #[test]
    fn test_contact_widget_only_with_site_key() {
        let mut view = ContactView {
            success: false,
            error: None,
            email: "",
            message: "",
            recaptcha_site_key: None,
        };
        assert!(!contact(&view).contains("g-recaptcha"));
        view.recaptcha_site_key = Some("site-key");
        assert!(contact(&view).contains(r#"data-sitekey="site-key""#));
    }
}
