//! REX orders to Winner listings.

use chrono::NaiveDate;
use indexmap::IndexMap;

use super::fields::{format_date, phone, trimmed, yes_no, zint};
use super::matrix::{self, Facts};
use super::routing::{route, zint_at, Route, Subtype};
use crate::config::{ExportConfig, ORDER_PATTERN, PROGRESS_INTERVAL, XSI_NAMESPACE};
use crate::convert::Task;
use crate::dictionary::DictionarySet;
use crate::error::Result;
use crate::registry::{stream_documents, StreamItem, SubtreePattern};
use crate::tree::Element;
use crate::types::{Direction, Document};
use crate::xml::{to_xml, wrap_document};

/// Commercial object types Winner accepts; other commercial listings are
/// skipped without an error.
const COMMERCIAL_OBJECTS: [i64; 3] = [7, 8, 9];

const SALE_OR_RENT: &str = "продается/арендуется";

/// Read access to one REX order.
struct Order<'a> {
    order: &'a Element,
    dic: &'a DictionarySet,
}

impl Order<'_> {
    /// Trimmed text or attribute value at `path`.
    fn text(&self, path: &str) -> Option<String> {
        trimmed(self.order.value_at(path))
    }

    /// Winner label for the REX id at `path`.
    fn label(&self, dictionary: &str, path: &str) -> Option<String> {
        let key = self.order.value_at(path)?.trim();
        self.dic.from_id(dictionary, key)
    }

    fn flag(&self, path: &str, yes: &str, no: &str) -> Option<String> {
        yes_no(self.order.value_at(path), yes, no)
    }

    fn has_mortgage(&self) -> bool {
        self.order.find("mortgage").is_some_and(|m| {
            m.children_named("term")
                .any(|term| matches!(zint(term.attr("id")), 2 | 3))
        })
    }

    fn photos(&self) -> Option<String> {
        let urls: Vec<&str> = self
            .order
            .find("meta/attachments")
            .into_iter()
            .flat_map(|a| a.children_named("attachment"))
            .filter(|a| matches!(a.value_at("type").map(str::trim), Some("image" | "planning")))
            .filter_map(|a| a.value_at("url").map(str::trim))
            .filter(|url| !url.is_empty())
            .collect();
        (!urls.is_empty()).then(|| urls.join(";"))
    }

    fn metro(&self) -> Option<Element> {
        let station = self.text("estate/transport/metro/station")?;
        let mut metro = Element::new("metro").with_text(station);
        if let Some(time) = self.text("estate/transport/metro/time") {
            metro.set_attr("farval", time);
        }
        if let Some(kind) = self.label("metro_type", "estate/transport/metro/type@id") {
            metro.set_attr("fartp", kind);
        }
        Some(metro)
    }
}

fn with_attrs(name: &str, attributes: &[(&str, Option<String>)]) -> Element {
    let mut element = Element::new(name);
    for (key, value) in attributes {
        if let Some(value) = value {
            element.set_attr(*key, value.clone());
        }
    }
    element
}

fn rub(name: &str, amount: Option<String>) -> Element {
    let element = Element::new(name).with_attr("currency", "RUB");
    match amount {
        Some(amount) => element.with_text(amount),
        None => element,
    }
}

/// Replace a field in place, or drop it when the new value is absent.
fn replace_text(listing: &mut Element, name: &str, value: Option<String>) {
    match value {
        Some(value) => listing.set_child(Element::new(name).with_text(value)),
        None => listing.remove_children(name),
    }
}

/// Build the Winner listing for an order already routed to `subtype`.
///
/// No field is checked here; see [`matrix::check`].
#[must_use]
pub fn convert_order(
    order: &Element,
    subtype: Subtype,
    dic: &DictionarySet,
    config: &ExportConfig,
    today: NaiveDate,
) -> Element {
    let src = Order { order, dic };
    let flats = subtype == Subtype::Flats;
    let rent = subtype == Subtype::Rent;
    let country = subtype == Subtype::Country;
    let commercial = subtype == Subtype::Commercial;
    let renting = matches!(zint_at(order, "type@id"), 3 | 4);
    let region = zint_at(order, "estate/location/region@id");
    let city = config.is_city(region);
    let region_label = dic.from_id("region_geo", &region.to_string());

    let rent_term = if renting {
        src.label("rent_term", "rent/short")
    } else {
        None
    };
    let factor = if commercial {
        let daily = rent_term
            .as_deref()
            .is_some_and(|t| t.trim().to_lowercase() == "посуточно");
        if daily {
            Some("в сутки".to_string())
        } else {
            dic.from_id("rent_factor", &zint(order.value_at("rent/term")).to_string())
        }
    } else {
        None
    };

    let mut out = Element::new(subtype.output().element);
    out.push_text("id", trimmed(order.attr("id")));
    out.push_text("date", Some(format_date(today)));
    out.push_text(
        "actual",
        Some(if renting { "арендуется" } else { "продается" }.to_string()),
    );
    out.push_text("aptp", src.label("aptp", "estate/object@id"));
    if flats {
        let novo = matches!(zint_at(order, "estate/house/ready_status@id"), 1 | 2);
        out.push_text("nova", Some(if novo { "+" } else { "-" }.to_string()));
    }
    if renting {
        out.push_text("rent_term", rent_term.clone());
    }
    if commercial || country {
        out.push_text("optp", Some(if renting { "аренда" } else { "продажа" }.to_string()));
    }
    out.push_text("region_geo", region_label.clone());
    out.push_text(
        "area_geo",
        if city {
            src.text("estate/location/district")
        } else {
            src.text("estate/location/area")
        },
    );
    out.push_text(
        "place_geo",
        if city {
            region_label
        } else {
            src.text("estate/location/string")
        },
    );
    if let Some(metro) = src.metro() {
        out.push(metro);
    }
    out.push_text(
        "address",
        trimmed(order.coalesce(&["estate/location/street", "estate/location/string"])),
    );
    out.push_text("dom", src.text("estate/location/house"));
    out.push(rub("price", src.text("price/full")));
    if commercial {
        if let Some(per_meter) = src.text("price/per_meter") {
            out.push(rub("price_sq", Some(per_meter)));
            out.push_text("factor_sq", factor.clone());
        }
    }
    if flats || rent {
        out.push_text("flats", src.text("estate/flat/rooms/total"));
        out.push_text("rooms", src.text("estate/flat/rooms/actual"));
    }
    let kitchen = src
        .text("estate/flat/space/kitchen")
        .map(|k| zint(Some(k.as_str())).min(config.kitchen_area_limit).to_string());
    out.push(with_attrs(
        "sq",
        &[
            ("pl_ob", src.text("estate/flat/space/total")),
            ("pl", src.text("estate/flat/space/living")),
            ("kitch", kitchen),
            ("pl_r", src.text("estate/flat/space/desc")),
        ],
    ));

    if country {
        out.push_text("electro", src.flag("estate/facilities/electricity", "есть", "нет"));
        out.push_text("gas", src.flag("estate/facilities/gas", "есть", "нет"));
        out.push_text("water", src.flag("estate/facilities/water", "есть", "нет"));
        out.push_text("heat", src.label("heat", "estate/facilities/heating@id"));
        out.push_text("sewer", src.label("sewer", "estate/facilities/sewer@id"));
        out.push_text("ohrana", src.flag("estate/facilities/concierge", "+", "-"));
    }
    if flats || rent || commercial {
        for (name, path) in [("floor", "estate/flat/storey/actual"), ("fl_ob", "estate/flat/storey/total")] {
            let value = zint(order.value_at(path));
            out.push_text(name, (value != 0).then(|| value.to_string()));
        }
    }
    if flats || rent {
        out.push_text("tip", src.label("tip", "estate/house/type@id"));
    }
    if flats {
        out.push_text("lift", src.flag("estate/facilities/elevator", "лифт", "без лифта"));
        out.push_text(
            "musor",
            src.flag("estate/facilities/garbage_chute", "мусоропровод", "без мусоропровода"),
        );
    }
    if flats || rent {
        out.push_text("balkon", src.label("balkon", "estate/facilities/balcony@id"));
        out.push_text("san", src.label("san", "estate/facilities/bath@id"));
    }
    if flats {
        out.push_text("okna", src.label("okna", "estate/facilities/view@id"));
        out.push_text("pol", src.label("pol", "estate/facilities/floor@id"));
    }
    if flats || rent {
        out.push_text("tel", src.flag("estate/facilities/phone", "Т", "-"));
    }
    if flats {
        out.push_text("ipoteka", Some(if src.has_mortgage() { "+" } else { "-" }.to_string()));
    }
    if rent {
        out.push_text("mebel", src.flag("estate/facilities/furniture", "+", "-"));
        out.push_text("xolod", src.flag("estate/facilities/fridge", "+", "-"));
        out.push_text("tv", src.flag("estate/facilities/tv", "+", "-"));
        out.push_text("washer", src.flag("estate/facilities/washmachine", "+", "-"));
    }
    out.push_text(
        "telefon",
        order
            .value_at("owner/agent/phone")
            .and_then(|p| phone(p, config)),
    );
    out.push_text("email", src.text("owner/agent/email"));
    out.push_text("company_url", src.text("owner/url"));
    out.push_text("object_url", src.text("meta/link"));
    out.push_text("photos", src.photos());
    out.push_text("remark", src.text("estate/desc/text"));

    if country {
        replace_text(&mut out, "actual", Some(SALE_OR_RENT.to_string()));
        replace_text(&mut out, "place_geo", src.text("estate/location/string"));
        replace_text(&mut out, "address", src.text("estate/location/street"));
        out.set_child(with_attrs(
            "sq",
            &[
                ("pl", src.text("estate/flat/space/total")),
                ("pl_s", src.text("estate/plot/space")),
            ],
        ));
    }
    if commercial {
        let other = out
            .value_at("aptp")
            .is_some_and(|a| a.trim().to_lowercase() == "иное");
        if other {
            replace_text(&mut out, "aptp", src.label("com_purpose", "estate/commerce/purpose@id"));
        }
        replace_text(&mut out, "actual", Some(SALE_OR_RENT.to_string()));
        out.push_text("factor", factor);
        out.set_child(with_attrs(
            "sq",
            &[
                (
                    "pl_min",
                    trimmed(order.coalesce(&[
                        "estate/commerce/space/business",
                        "estate/commerce/space/total",
                    ])),
                ),
                (
                    "pl_max",
                    trimmed(order.coalesce(&[
                        "estate/commerce/space/total",
                        "estate/commerce/space/business",
                    ])),
                ),
            ],
        ));
        out.push_text("park", src.flag("estate/facilities/parking", "+", "-"));
    }
    out
}

/// Route, convert and check one order, recording errors and statistics.
///
/// Returns the listing only when every mandatory field is present.
pub fn export_order(task: &mut Task, dic: &DictionarySet, order: &Element) -> Option<(Subtype, Element)> {
    let oid = order.coalesce(&["@id", "meta/extid"]).map(str::to_string);
    let subtype = match route(order, &task.config.export) {
        Route::Out(subtype) => subtype,
        Route::OutsideRegion => {
            tracing::debug!(id = ?oid, "Order outside exported regions, skipping");
            return None;
        }
        Route::Unroutable => {
            task.errors
                .fatal(oid.as_deref(), "Couldn't find appropriate file for the order");
            return None;
        }
    };
    if subtype == Subtype::Commercial
        && !COMMERCIAL_OBJECTS.contains(&zint_at(order, "estate/object@id"))
    {
        tracing::debug!(id = ?oid, "Commercial object type not exported, skipping");
        return None;
    }

    let listing = convert_order(order, subtype, dic, &task.config.export, task.config.today);
    let facts = Facts {
        deal_type: zint_at(order, "type@id"),
        object_type: zint_at(order, "estate/object@id"),
        city: task
            .config
            .export
            .is_city(zint_at(order, "estate/location/region@id")),
    };
    let missing = matrix::check(Direction::Export, subtype, &facts, &listing);
    for rule in &missing {
        task.errors.fatal(oid.as_deref(), rule.to_string());
    }

    if missing.is_empty() {
        tracing::debug!(id = ?oid, %subtype, "Exported order");
        task.stats.ok(order);
        Some((subtype, listing))
    } else {
        task.stats.fail(order);
        None
    }
}

/// Export every order of the input documents into Winner files.
///
/// Files appear in the order their first listing was produced; subtypes
/// without listings produce no file.
///
/// # Errors
/// Only an unusable dictionary.
pub fn export_documents(task: &mut Task, input: &[Document]) -> Result<Vec<Document>> {
    let dic = task.dictionary()?;
    let patterns = [SubtreePattern::parse(ORDER_PATTERN)?];
    let mut files: IndexMap<Subtype, Vec<String>> = IndexMap::new();
    let (mut processed, mut exported) = (0usize, 0usize);

    for item in stream_documents(input, &patterns) {
        match item {
            StreamItem::Issue(issue) => task.parse_issue(&issue),
            StreamItem::Match { tree, .. } => {
                processed += 1;
                if let Some((subtype, listing)) = export_order(task, &dic, &tree) {
                    exported += 1;
                    files.entry(subtype).or_default().push(to_xml(&listing));
                }
                if processed % PROGRESS_INTERVAL == 0 {
                    tracing::info!(processed, exported, "Export progress");
                }
            }
        }
    }
    tracing::info!(processed, exported, files = files.len(), "Export finished");

    Ok(files
        .into_iter()
        .map(|(subtype, fragments)| {
            let output = subtype.output();
            let contents = wrap_document(
                output.root,
                &[
                    ("xmlns:xsi", XSI_NAMESPACE),
                    ("xsi:noNamespaceSchemaLocation", output.schema),
                ],
                &fragments,
            );
            Document::new(output.file, contents)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TaskConfig;
    use crate::report::Level;
    use crate::xml::parse_element;

    const DIC: &str = r#"
[aptp]
1 квартира
2 комната
7 офис
8 иное
[region_geo]
7800000000000 Санкт-Петербург
4700000000000 "Ленинградская обл."
[metro_type]
1 пешком
[rent_term]
true посуточно
false длительно
[rent_factor]
1 "в месяц"
[com_purpose]
3 склад
[tip]
1 кирпичный
[heat]
1 центральное
"#;

    fn dic() -> DictionarySet {
        DictionarySet::parse(DIC).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn task() -> Task {
        Task::new("winner", Direction::Export, TaskConfig::new("dic.txt").with_today(today()))
            .with_dictionary(dic())
    }

    fn flat_order() -> Element {
        parse_element(
            r#"<order id="101">
                <type id="2">продажа</type>
                <price><full>12500000</full></price>
                <owner><agent><phone>123-45-67</phone><email>a@b.ru</email></agent></owner>
                <estate>
                    <location>
                        <region id="7800000000000">Санкт-Петербург</region>
                        <district>Центральный</district>
                        <street>Фурштатская ул.</street>
                        <house>5</house>
                    </location>
                    <type id="1">жилая</type>
                    <object id="1">квартира</object>
                    <house><type id="1"/><ready_status id="2"/></house>
                    <flat>
                        <space><total>45.5</total><kitchen>900</kitchen></space>
                        <storey><actual>3</actual><total>5</total></storey>
                        <rooms><total>2</total></rooms>
                    </flat>
                    <transport><metro><station>Чернышевская</station><time>5</time><type id="1"/></metro></transport>
                    <facilities><elevator>true</elevator></facilities>
                    <desc><text> Светлая квартира </text></desc>
                </estate>
                <mortgage><term id="3"/></mortgage>
                <meta>
                    <attachments>
                        <attachment><type>image</type><url>http://x/1.jpg</url></attachment>
                        <attachment><type>video</type><url>http://x/1.avi</url></attachment>
                        <attachment><type>planning</type><url>http://x/2.jpg</url></attachment>
                    </attachments>
                </meta>
            </order>"#,
        )
        .unwrap()
    }

    fn names(listing: &Element) -> Vec<&str> {
        listing.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_convert_flat() {
        let listing = convert_order(&flat_order(), Subtype::Flats, &dic(), &ExportConfig::default(), today());
        assert_eq!(listing.name, "flat");
        assert_eq!(listing.value_at("id"), Some("101"));
        assert_eq!(listing.value_at("date"), Some("19-10-2026"));
        assert_eq!(listing.value_at("actual"), Some("продается"));
        assert_eq!(listing.value_at("aptp"), Some("квартира"));
        assert_eq!(listing.value_at("nova"), Some("+"));
        assert_eq!(listing.value_at("region_geo"), Some("Санкт-Петербург"));
        assert_eq!(listing.value_at("area_geo"), Some("Центральный"));
        assert_eq!(listing.value_at("place_geo"), Some("Санкт-Петербург"));
        assert_eq!(listing.value_at("metro"), Some("Чернышевская"));
        assert_eq!(listing.value_at("metro@farval"), Some("5"));
        assert_eq!(listing.value_at("metro@fartp"), Some("пешком"));
        assert_eq!(listing.value_at("price@currency"), Some("RUB"));
        assert_eq!(listing.value_at("sq@kitch"), Some("500"));
        assert_eq!(listing.value_at("sq@pl"), None);
        assert_eq!(listing.value_at("lift"), Some("лифт"));
        assert_eq!(listing.value_at("ipoteka"), Some("+"));
        assert_eq!(listing.value_at("telefon"), Some("88121234567"));
        assert_eq!(listing.value_at("photos"), Some("http://x/1.jpg;http://x/2.jpg"));
        assert_eq!(listing.value_at("remark"), Some("Светлая квартира"));
        assert_eq!(
            names(&listing)[..12],
            ["id", "date", "actual", "aptp", "nova", "region_geo", "area_geo", "place_geo", "metro", "address", "dom", "price"]
        );
    }

    #[test]
    fn test_export_order_success_and_stats() {
        let mut task = task();
        let dic = dic();
        let (subtype, _) = export_order(&mut task, &dic, &flat_order()).unwrap();
        assert_eq!(subtype, Subtype::Flats);
        assert!(task.errors.is_empty());
        assert_eq!(task.stats.totals().ok, 1);
        assert_eq!(task.stats.photos().total, 3);
    }

    #[test]
    fn test_missing_field_fails_object() {
        let mut order = flat_order();
        if let Some(location) = order.child_mut("estate").and_then(|e| e.child_mut("location")) {
            location.remove_children("house");
        }
        let mut task = task();
        assert!(export_order(&mut task, &dic(), &order).is_none());
        assert_eq!(task.errors.len(), 1);
        assert_eq!(task.errors.list()[0].level, Level::Fatal);
        assert_eq!(task.errors.list()[0].id.as_deref(), Some("101"));
        assert_eq!(task.errors.list()[0].message, "Missing house number (dom)");
        assert_eq!(task.stats.totals().fail, 1);
    }

    #[test]
    fn test_outside_region_dropped_silently() {
        let xml = to_xml(&flat_order()).replace("7800000000000", "7700000000000");
        let mut task = task();
        assert!(export_order(&mut task, &dic(), &parse_element(&xml).unwrap()).is_none());
        assert!(task.errors.is_empty());
        assert_eq!(task.stats.totals().total, 0);
    }

    #[test]
    fn test_commercial_listing() {
        let order = parse_element(
            r#"<order id="7">
                <type id="3">аренда</type>
                <price><per_meter>1500</per_meter></price>
                <rent><term>1</term></rent>
                <estate>
                    <location><region id="4700000000000"/><area>Всеволожский</area><string>Всеволожск</string><street>Ленинградская</street></location>
                    <type id="3">коммерческая</type>
                    <object id="8"/>
                    <commerce><purpose id="3"/><space><total>300</total></space></commerce>
                    <flat><storey><actual>1</actual></storey></flat>
                    <facilities><parking>true</parking></facilities>
                </estate>
            </order>"#,
        )
        .unwrap();
        let listing = convert_order(&order, Subtype::Commercial, &dic(), &ExportConfig::default(), today());
        assert_eq!(listing.name, "commercial");
        assert_eq!(listing.value_at("aptp"), Some("склад"));
        assert_eq!(listing.value_at("actual"), Some(SALE_OR_RENT));
        assert_eq!(listing.value_at("optp"), Some("аренда"));
        assert_eq!(listing.value_at("factor"), Some("в месяц"));
        assert_eq!(listing.value_at("factor_sq"), Some("в месяц"));
        assert_eq!(listing.value_at("sq@pl_min"), Some("300"));
        assert_eq!(listing.value_at("sq@pl_max"), Some("300"));
        assert_eq!(listing.value_at("park"), Some("+"));
        assert_eq!(listing.value_at("floor"), Some("1"));
        assert_eq!(listing.value_at("fl_ob"), None);
        assert_eq!(names(&listing).last(), Some(&"park"));
    }

    #[test]
    fn test_commercial_other_objects_skipped() {
        let order = parse_element(
            r#"<order id="8"><type id="2"/><estate><location><region id="7800000000000"/></location><type id="3"/><object id="1"/></estate></order>"#,
        )
        .unwrap();
        let mut task = task();
        assert!(export_order(&mut task, &dic(), &order).is_none());
        assert!(task.errors.is_empty());
        assert_eq!(task.stats.totals().total, 0);
    }

    #[test]
    fn test_country_overrides() {
        let order = parse_element(
            r#"<order id="9">
                <type id="2"/>
                <estate>
                    <location><region id="4700000000000"/><area>Выборгский</area><string>пос. Рощино</string><street>Садовая</street></location>
                    <type id="2"/>
                    <object id="5"/>
                    <flat><space><total>120</total></space></flat>
                    <plot><space>15</space></plot>
                    <facilities><electricity>true</electricity><gas>false</gas><heating id="1"/></facilities>
                </estate>
            </order>"#,
        )
        .unwrap();
        let listing = convert_order(&order, Subtype::Country, &dic(), &ExportConfig::default(), today());
        assert_eq!(listing.name, "country_house");
        assert_eq!(listing.value_at("actual"), Some(SALE_OR_RENT));
        assert_eq!(listing.value_at("optp"), Some("продажа"));
        assert_eq!(listing.value_at("place_geo"), Some("пос. Рощино"));
        assert_eq!(listing.value_at("address"), Some("Садовая"));
        assert_eq!(listing.value_at("sq@pl"), Some("120"));
        assert_eq!(listing.value_at("sq@pl_s"), Some("15"));
        assert_eq!(listing.value_at("sq@pl_ob"), None);
        assert_eq!(listing.value_at("electro"), Some("есть"));
        assert_eq!(listing.value_at("gas"), Some("нет"));
        assert_eq!(listing.value_at("water"), None);
        assert_eq!(listing.value_at("heat"), Some("центральное"));
        assert!(listing.child("nova").is_none());
    }

    #[test]
    fn test_export_documents_groups_files() {
        let rent = to_xml(&flat_order())
            .replace(r#"<type id="2">продажа</type>"#, r#"<type id="4">аренда</type>"#)
            .replace(r#"order id="101""#, r#"order id="102""#)
            .replace("<mortgage>", "<rent><short>false</short></rent><mortgage>");
        let input = vec![Document::new(
            "orders.xml",
            format!("<root><orders>{}{rent}</orders></root>", to_xml(&flat_order())),
        )];
        let mut task = task();
        let files = export_documents(&mut task, &input).unwrap();

        let names: Vec<&str> = files.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["flats_spb.xml", "rent_spb.xml"]);
        assert!(files[0].contents.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><flats xmlns:xsi="#));
        assert!(files[0].contents.contains(r#"xsi:noNamespaceSchemaLocation="flats_spb.xsd""#));
        assert!(files[1].contents.contains("<rent_term>"));
        assert_eq!(task.stats.totals().ok, 2);
    }

    #[test]
    fn test_parse_errors_become_warnings() {
        let input = vec![Document::new("broken.xml", "<root><orders><order id=\"1\">")];
        let mut task = task();
        let files = export_documents(&mut task, &input).unwrap();
        assert!(files.is_empty());
        assert!(task.errors.list().iter().all(|r| r.level == Level::Warn));
        assert!(!task.errors.is_empty());
    }
}
