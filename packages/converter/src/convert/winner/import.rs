//! Winner listings to REX orders.

use super::fields::{
    bool_is, date_to_timestamp, false_is, fl0_text, fl_text, strip_words, trimmed, zint,
    DISTRICT_NOISE, METRO_NOISE,
};
use super::matrix::{self, Facts};
use super::routing::Subtype;
use crate::config::{ExportConfig, PROGRESS_INTERVAL, XML_DECLARATION};
use crate::convert::Task;
use crate::dictionary::{DicEntry, DictionarySet};
use crate::error::Result;
use crate::numbers::parse_int;
use crate::registry::{stream_documents, StreamItem, SubtreePattern};
use crate::tree::Element;
use crate::types::{Direction, Document};
use crate::xml::to_xml;

/// Name of the single document an import produces.
pub const OUTPUT_NAME: &str = "rex.xml";

/// Containers kept in the order even when empty: their presence is data.
const KEEP_EMPTY: [&str; 2] = ["rent", "commerce"];

/// `<name id="...">comment</name>` for a dictionary hit.
fn entry(name: &str, found: Option<DicEntry>) -> Option<Element> {
    let found = found?;
    let element = Element::new(name).with_attr("id", found.id);
    Some(if found.comment.is_empty() {
        element
    } else {
        element.with_text(found.comment)
    })
}

fn fixed(name: &str, id: &str, label: &str) -> Element {
    Element::new(name).with_attr("id", id).with_text(label)
}

fn push_opt(parent: &mut Element, child: Option<Element>) {
    if let Some(child) = child {
        parent.push(child);
    }
}

/// Drop empty elements, bottom-up, except the [`KEEP_EMPTY`] containers.
fn prune(element: &mut Element) {
    for child in &mut element.children {
        prune(child);
    }
    element
        .children
        .retain(|c| !c.is_empty() || KEEP_EMPTY.contains(&c.name.as_str()));
}

/// Read access to one Winner listing.
struct Listing<'a> {
    listing: &'a Element,
    dic: &'a DictionarySet,
}

impl Listing<'_> {
    fn text(&self, path: &str) -> Option<String> {
        trimmed(self.listing.value_at(path))
    }

    fn key(&self, path: &str) -> Option<&str> {
        self.listing
            .value_at(path)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn lookup(&self, name: &str, dictionary: &str, path: &str) -> Option<Element> {
        entry(name, self.key(path).and_then(|k| self.dic.lookup(dictionary, k)))
    }

    fn ilookup(&self, name: &str, dictionary: &str, path: &str) -> Option<Element> {
        entry(name, self.key(path).and_then(|k| self.dic.ilookup(dictionary, k)))
    }

    fn reverse(&self, name: &str, dictionary: &str, path: &str) -> Option<Element> {
        entry(name, self.key(path).and_then(|k| self.dic.reverse(dictionary, k)))
    }
}

/// Build the REX order for a Winner listing of `subtype`.
///
/// No field is checked here; see [`matrix::check`].
#[must_use]
pub fn convert_listing(
    listing: &Element,
    subtype: Subtype,
    dic: &DictionarySet,
    config: &ExportConfig,
) -> Element {
    let src = Listing { listing, dic };
    let deal = src
        .key("actual")
        .and_then(|a| dic.lookup("rex_type", a))
        .or_else(|| src.key("optp").and_then(|o| dic.lookup("rex_type_optp", o)));
    let renting = subtype == Subtype::Rent || deal.as_ref().is_some_and(|d| zint(Some(d.id.as_str())) == 4);
    let region = src.key("region_geo").and_then(|r| dic.reverse("region_geo", r));
    let city = region
        .as_ref()
        .and_then(|r| parse_int(&r.id))
        .is_some_and(|id| config.is_city(id));
    let phones: Vec<String> = src
        .key("telefon")
        .map(|t| {
            t.split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut order = Element::new("order");
    if let Some(mtm) = src.key("date").and_then(date_to_timestamp) {
        order.set_attr("mtm", mtm.to_string());
    }
    push_opt(&mut order, entry("type", deal));

    let mut price = Element::new("price");
    price.push_text("full", src.text("price"));
    order.push(price);

    let mut agent = Element::new("agent");
    agent.push_text("phone", phones.first().cloned());
    agent.push_text("email", src.text("email"));
    let mut additional = Element::new("additional");
    for phone in phones.iter().skip(1) {
        additional.push_text("phone", Some(phone.clone()));
    }
    agent.push(additional);
    let mut owner = Element::new("owner").with_child(agent);
    owner.push_text("url", src.text("company_url"));
    order.push(owner);

    let mut estate = Element::new("estate");

    let mut location = Element::new("location").with_child(fixed("country", "1", "Россия"));
    push_opt(&mut location, entry("region", region.clone()));
    if city {
        push_opt(&mut location, entry("area", region));
        location.push(fixed("city", "1", "Санкт-Петербург"));
        let district = src
            .key("area_geo")
            .map(|a| strip_words(a, DISTRICT_NOISE))
            .and_then(|a| dic.lookup("rex_district", &a));
        push_opt(&mut location, entry("district", district));
        location.push_text("street", src.text("address"));
    } else {
        push_opt(&mut location, src.lookup("area", "rex_area", "area_geo"));
    }
    location.push_text("house", src.text("dom"));
    location.push_text("string", src.text("address"));
    estate.push(location);

    estate.push(fixed("type", "1", "жилая"));
    push_opt(&mut estate, src.reverse("object", "aptp", "aptp"));
    let mut desc = Element::new("desc");
    desc.push_text("text", src.text("remark"));
    estate.push(desc);

    let mut house = Element::new("house");
    push_opt(&mut house, src.reverse("type", "tip", "tip"));
    if src.key("nova") == Some("+") {
        house.push(fixed("ready_status", "1", "строится"));
    }
    estate.push(house);

    let mut space = Element::new("space");
    space.push_text("total", fl_text(listing.value_at("sq@pl_ob")));
    space.push_text("living", fl0_text(listing.value_at("sq@pl")));
    space.push_text("kitchen", fl0_text(listing.value_at("sq@kitch")));
    space.push_text("desc", src.text("sq@pl_r"));
    let mut storey = Element::new("storey");
    storey.push_text("actual", src.text("floor"));
    storey.push_text("total", src.text("fl_ob"));
    let mut rooms = Element::new("rooms");
    rooms.push_text("total", src.text("flats"));
    rooms.push_text("actual", src.text("rooms"));
    estate.push(
        Element::new("flat")
            .with_child(space)
            .with_child(storey)
            .with_child(rooms),
    );

    let mut metro = Element::new("metro");
    let station = src
        .key("metro")
        .map(|m| strip_words(m, METRO_NOISE))
        .and_then(|m| dic.ilookup("rex_metro", &m));
    push_opt(&mut metro, entry("station", station));
    metro.push_text("time", src.text("metro@farval"));
    push_opt(&mut metro, src.reverse("type", "metro_type", "metro@fartp"));
    estate.push(Element::new("transport").with_child(metro));

    let mut facilities = Element::new("facilities");
    facilities.push_text("elevator", bool_is(listing.value_at("lift"), "лифт"));
    facilities.push_text(
        "garbage_chute",
        bool_is(listing.value_at("musor"), "мусоропровод"),
    );
    push_opt(&mut facilities, src.ilookup("balcony", "rex_balcony", "balkon"));
    push_opt(&mut facilities, src.ilookup("bath", "rex_bath_type", "san"));
    push_opt(&mut facilities, src.ilookup("view", "rex_view_type", "okna"));
    push_opt(&mut facilities, src.ilookup("floor", "rex_floor_type", "pol"));
    push_opt(&mut facilities, src.ilookup("decoration", "rex_decoration_type", "remont"));
    push_opt(&mut facilities, src.ilookup("phone", "rex_phone", "tel"));
    for (name, field) in [
        ("furniture", "mebel"),
        ("fridge", "xolod"),
        ("tv", "tv"),
        ("washmachine", "washer"),
    ] {
        facilities.push_text(name, bool_is(listing.value_at(field), "+"));
    }

    match subtype {
        Subtype::Country => {
            estate.set_child(fixed("type", "2", "загородная"));
            let place: Vec<String> = [src.text("place_geo"), src.text("address")]
                .into_iter()
                .flatten()
                .collect();
            if let Some(location) = estate.child_mut("location") {
                location.remove_children("string");
                if !place.is_empty() {
                    location.push(Element::new("string").with_text(place.join(", ")));
                }
            }
            let mut plot = Element::new("plot");
            plot.push_text("space", fl0_text(listing.value_at("sq@pl_s")));
            estate.push(plot);
            for (name, field) in [("electricity", "electro"), ("gas", "gas"), ("water", "water")] {
                facilities.push_text(name, false_is(listing.value_at(field), "нет"));
            }
            push_opt(&mut facilities, src.lookup("heating", "rex_heating", "heat"));
            push_opt(&mut facilities, src.lookup("sewer", "rex_sewer", "sewer"));
            facilities.push_text("guard", bool_is(listing.value_at("ohrana"), "+"));
        }
        Subtype::Commercial => {
            estate.set_child(fixed("type", "3", "коммерческая"));
            let mut commerce = Element::new("commerce");
            match src.lookup("object", "rex_com_object", "aptp") {
                Some(object) => {
                    estate.set_child(object);
                    if let Some(aptp) = src.text("aptp") {
                        commerce.push(fixed("purpose", "7", &aptp));
                    }
                }
                None => {
                    estate.set_child(fixed("object", "8", "нежилое помещение"));
                    push_opt(&mut commerce, src.lookup("purpose", "rex_com_purpose", "aptp"));
                }
            }
            estate.push(commerce);
        }
        Subtype::Flats | Subtype::Rent => {}
    }
    estate.push(facilities);
    order.push(estate);

    let mut meta = Element::new("meta");
    meta.push_text("extid", src.text("id"));
    meta.push_text("link", src.text("object_url"));
    let mut attachments = Element::new("attachments");
    if let Some(photos) = src.key("photos") {
        for url in photos.split(';').map(str::trim).filter(|u| !u.is_empty()) {
            attachments.push(
                Element::new("attachment")
                    .with_child(Element::new("type").with_text("image"))
                    .with_child(Element::new("url").with_text(url)),
            );
        }
    }
    meta.push(attachments);
    order.push(meta);

    if src.key("ipoteka") == Some("+") {
        order.push(Element::new("mortgage").with_child(fixed("term", "2", "ипотека")));
    }
    if renting {
        let mut rent = Element::new("rent");
        if src.key("rent_term") == Some("посуточно") {
            rent.push(Element::new("short").with_text("true"));
        }
        order.push(rent);
    }

    prune(&mut order);
    order
}

/// Convert and check one listing, recording errors and statistics.
///
/// Failed orders are counted but not returned.
pub fn import_listing(
    task: &mut Task,
    dic: &DictionarySet,
    listing: &Element,
    subtype: Subtype,
) -> Option<String> {
    let oid = listing.value_at("id").map(str::trim).map(str::to_string);
    let order = convert_listing(listing, subtype, dic, &task.config.export);
    let missing = matrix::check(Direction::Import, subtype, &Facts::default(), &order);
    for rule in &missing {
        task.errors.fatal(oid.as_deref(), rule.to_string());
    }

    let xml = to_xml(&order);
    if missing.is_empty() {
        tracing::debug!(id = ?oid, %subtype, "Imported listing");
        task.stats.ok(&xml);
        Some(xml)
    } else {
        task.stats.fail(&xml);
        None
    }
}

/// Import every listing of the input documents into one REX document.
///
/// # Errors
/// Only an unusable dictionary.
pub fn import_documents(task: &mut Task, input: &[Document]) -> Result<Document> {
    let dic = task.dictionary()?;
    let patterns = Subtype::ALL
        .iter()
        .map(|s| SubtreePattern::parse(&s.output().pattern()))
        .collect::<Result<Vec<_>>>()?;
    let mut orders = Vec::new();
    let mut processed = 0usize;

    for item in stream_documents(input, &patterns) {
        match item {
            StreamItem::Issue(issue) => task.parse_issue(&issue),
            StreamItem::Match { pattern, tree } => {
                processed += 1;
                let subtype = Subtype::ALL[pattern];
                if let Some(order) = import_listing(task, &dic, &tree, subtype) {
                    orders.push(order);
                }
                if processed % PROGRESS_INTERVAL == 0 {
                    tracing::info!(processed, imported = orders.len(), "Import progress");
                }
            }
        }
    }
    tracing::info!(processed, imported = orders.len(), "Import finished");

    let contents = format!(
        r#"{XML_DECLARATION}<root rev="1.0"><orders>{}</orders></root>"#,
        orders.join("\n")
    );
    Ok(Document::new(OUTPUT_NAME, contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TaskConfig;
    use crate::report::Level;
    use crate::xml::parse_element;

    const DIC: &str = r#"
[rex_type]
продается 2 продажа
арендуется 4 аренда
[rex_type_optp]
продажа 2 продажа
[region_geo]
7800000000000 Санкт-Петербург Санкт-Петербург
4700000000000 "Ленинградская обл." "Ленинградская область"
[rex_area]
Всеволожский 4702000000000 "Всеволожский район"
[rex_district]
Центральный 12 "Центральный район"
[aptp]
1 квартира квартира
2 комната комната
[rex_metro]
Чернышевская 51 Чернышевская
Восстания 14 "Площадь Восстания"
[rex_com_object]
офис 7 офис
[rex_com_purpose]
склад 3 склад
[rex_heating]
центральное 1 центральное
"#;

    fn dic() -> DictionarySet {
        DictionarySet::parse(DIC).unwrap()
    }

    fn task() -> Task {
        Task::new("winner", Direction::Import, TaskConfig::new("dic.txt")).with_dictionary(dic())
    }

    fn flat() -> Element {
        parse_element(
            r#"<flat>
                <id>101</id>
                <date>19-10-2026</date>
                <actual>продается</actual>
                <aptp>квартира</aptp>
                <nova>+</nova>
                <region_geo>Санкт-Петербург</region_geo>
                <area_geo>Центральный р-н</area_geo>
                <place_geo>Санкт-Петербург</place_geo>
                <metro farval="5">пл. Восстания</metro>
                <address>Невский пр.</address>
                <dom>85</dom>
                <price currency="RUB">12500000</price>
                <flats>2</flats>
                <sq pl_ob="45.5" pl="0" kitch="9"/>
                <floor>3</floor>
                <fl_ob>5</fl_ob>
                <lift>лифт</lift>
                <ipoteka>+</ipoteka>
                <telefon>88121234567; 89211234567</telefon>
                <photos>http://x/1.jpg;http://x/2.jpg</photos>
                <remark>Светлая квартира</remark>
            </flat>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_convert_flat() {
        let order = convert_listing(&flat(), Subtype::Flats, &dic(), &ExportConfig::default());
        assert_eq!(order.value_at("@mtm"), Some("1792368000"));
        assert_eq!(order.value_at("type@id"), Some("2"));
        assert_eq!(order.value_at("type"), Some("продажа"));
        assert_eq!(order.value_at("price/full"), Some("12500000"));
        assert_eq!(order.value_at("owner/agent/phone"), Some("88121234567"));
        assert_eq!(order.value_at("owner/agent/additional/phone"), Some("89211234567"));
        assert_eq!(order.value_at("estate/location/region@id"), Some("7800000000000"));
        assert_eq!(order.value_at("estate/location/area@id"), Some("7800000000000"));
        assert_eq!(order.value_at("estate/location/city"), Some("Санкт-Петербург"));
        assert_eq!(order.value_at("estate/location/district@id"), Some("12"));
        assert_eq!(order.value_at("estate/location/street"), Some("Невский пр."));
        assert_eq!(order.value_at("estate/type@id"), Some("1"));
        assert_eq!(order.value_at("estate/object@id"), Some("1"));
        assert_eq!(order.value_at("estate/house/ready_status@id"), Some("1"));
        assert_eq!(order.value_at("estate/flat/space/total"), Some("45.5"));
        assert_eq!(order.value_at("estate/flat/space/living"), None);
        assert_eq!(order.value_at("estate/flat/space/kitchen"), Some("9"));
        assert_eq!(order.value_at("estate/transport/metro/station@id"), Some("14"));
        assert_eq!(order.value_at("estate/transport/metro/time"), Some("5"));
        assert_eq!(order.value_at("estate/facilities/elevator"), Some("true"));
        assert_eq!(order.value_at("meta/extid"), Some("101"));
        assert_eq!(order.value_at("mortgage/term@id"), Some("2"));
        assert_eq!(order.find("meta/attachments").map(|a| a.children.len()), Some(2));
        assert!(order.child("rent").is_none());
        assert!(order.find("estate/commerce").is_none());
    }

    #[test]
    fn test_empty_containers_pruned() {
        let listing = parse_element("<flat><id>1</id><actual>продается</actual></flat>").unwrap();
        let order = convert_listing(&listing, Subtype::Flats, &dic(), &ExportConfig::default());
        assert!(order.child("owner").is_none());
        assert!(order.child("price").is_none());
        assert!(order.find("estate/flat").is_none());
        assert!(order.find("estate/transport").is_none());
        assert!(order.find("meta/attachments").is_none());
        assert_eq!(order.value_at("meta/extid"), Some("1"));
    }

    #[test]
    fn test_rent_block_kept_empty() {
        let listing = parse_element(
            "<flat><actual>арендуется</actual><rent_term>длительно</rent_term></flat>",
        )
        .unwrap();
        let order = convert_listing(&listing, Subtype::Rent, &dic(), &ExportConfig::default());
        let rent = order.child("rent").unwrap();
        assert!(rent.is_empty());

        let listing = parse_element("<flat><rent_term>посуточно</rent_term></flat>").unwrap();
        let order = convert_listing(&listing, Subtype::Rent, &dic(), &ExportConfig::default());
        assert_eq!(order.value_at("rent/short"), Some("true"));
    }

    #[test]
    fn test_country_listing() {
        let listing = parse_element(
            r#"<country_house>
                <id>9</id>
                <optp>продажа</optp>
                <region_geo>Ленинградская обл.</region_geo>
                <area_geo>Всеволожский</area_geo>
                <place_geo>Всеволожск</place_geo>
                <address>Садовая, 3</address>
                <sq pl="120" pl_s="15"/>
                <electro>есть</electro>
                <gas>нет</gas>
                <heat>Центральное</heat>
                <ohrana>+</ohrana>
            </country_house>"#,
        )
        .unwrap();
        let order = convert_listing(&listing, Subtype::Country, &dic(), &ExportConfig::default());
        assert_eq!(order.value_at("type@id"), Some("2"));
        assert_eq!(order.value_at("estate/type@id"), Some("2"));
        assert_eq!(order.value_at("estate/location/area@id"), Some("4702000000000"));
        assert!(order.find("estate/location/city").is_none());
        assert_eq!(order.value_at("estate/location/string"), Some("Всеволожск, Садовая, 3"));
        assert_eq!(order.value_at("estate/plot/space"), Some("15"));
        assert_eq!(order.value_at("estate/facilities/electricity"), Some("true"));
        assert_eq!(order.value_at("estate/facilities/gas"), Some("false"));
        assert_eq!(order.value_at("estate/facilities/guard"), Some("true"));
        // Forward lookups are case-sensitive.
        assert!(order.find("estate/facilities/heating").is_none());
    }

    #[test]
    fn test_commercial_object_and_purpose() {
        let office = parse_element("<commercial><aptp>офис</aptp></commercial>").unwrap();
        let order = convert_listing(&office, Subtype::Commercial, &dic(), &ExportConfig::default());
        assert_eq!(order.value_at("estate/object@id"), Some("7"));
        assert_eq!(order.value_at("estate/commerce/purpose@id"), Some("7"));
        assert_eq!(order.value_at("estate/commerce/purpose"), Some("офис"));

        let store = parse_element("<commercial><aptp>склад</aptp></commercial>").unwrap();
        let order = convert_listing(&store, Subtype::Commercial, &dic(), &ExportConfig::default());
        assert_eq!(order.value_at("estate/object@id"), Some("8"));
        assert_eq!(order.value_at("estate/commerce/purpose@id"), Some("3"));

        let other = parse_element("<commercial><aptp>гараж</aptp></commercial>").unwrap();
        let order = convert_listing(&other, Subtype::Commercial, &dic(), &ExportConfig::default());
        assert!(order.find("estate/commerce").is_some());
        assert!(order.find("estate/commerce/purpose").is_none());
    }

    #[test]
    fn test_import_listing_mandatory_fields() {
        let mut task = task();
        let listing = parse_element("<flat><id>5</id><aptp>квартира</aptp></flat>").unwrap();
        assert!(import_listing(&mut task, &dic(), &listing, Subtype::Flats).is_none());
        assert_eq!(task.errors.len(), 1);
        assert_eq!(task.errors.list()[0].level, Level::Fatal);
        assert_eq!(task.errors.list()[0].id.as_deref(), Some("5"));
        assert_eq!(task.errors.list()[0].message, "Missing deal type (type@id)");
        assert_eq!(task.stats.totals().fail, 1);
    }

    #[test]
    fn test_import_documents() {
        let input = vec![
            Document::new("flats_spb.xml", format!("<flats>{}</flats>", to_xml(&flat()))),
            Document::new(
                "commercial_spb.xml",
                "<commercials><commercial><id>7</id><actual>продается</actual><aptp>гараж</aptp></commercial></commercials>",
            ),
        ];
        let mut task = task();
        let doc = import_documents(&mut task, &input).unwrap();

        assert_eq!(doc.name, OUTPUT_NAME);
        assert!(doc.contents.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><root rev="1.0"><orders><order"#));
        assert!(doc.contents.ends_with("</order></orders></root>"));
        assert_eq!(doc.contents.matches("<order ").count(), 1);
        assert_eq!(task.stats.totals().ok, 1);
        assert_eq!(task.stats.totals().fail, 1);
        assert_eq!(task.errors.list()[0].message, "Missing commercial purpose (estate/commerce/purpose@id)");
    }
}
