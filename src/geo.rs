//! Static reference data for French administrative geography.
//!
//! Used to validate vigilance department codes, resolve a department's region,
//! seed the database and locate regions for provider alert checks.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepartmentInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub region: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamedPlace {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

pub const AUVERGNE_RHONE_ALPES: &str = "Auvergne-Rhône-Alpes";
pub const BOURGOGNE_FRANCHE_COMTE: &str = "Bourgogne-Franche-Comté";
pub const BRETAGNE: &str = "Bretagne";
pub const CENTRE_VAL_DE_LOIRE: &str = "Centre-Val de Loire";
pub const CORSE: &str = "Corse";
pub const GRAND_EST: &str = "Grand Est";
pub const HAUTS_DE_FRANCE: &str = "Hauts-de-France";
pub const ILE_DE_FRANCE: &str = "Île-de-France";
pub const NORMANDIE: &str = "Normandie";
pub const NOUVELLE_AQUITAINE: &str = "Nouvelle-Aquitaine";
pub const OCCITANIE: &str = "Occitanie";
pub const PAYS_DE_LA_LOIRE: &str = "Pays de la Loire";
pub const PROVENCE_ALPES_COTE_DAZUR: &str = "Provence-Alpes-Côte d'Azur";
pub const GUADELOUPE: &str = "Guadeloupe";
pub const MARTINIQUE: &str = "Martinique";
pub const GUYANE: &str = "Guyane";
pub const LA_REUNION: &str = "La Réunion";
pub const MAYOTTE: &str = "Mayotte";

pub const REGIONS: &[&str] = &[
    AUVERGNE_RHONE_ALPES,
    BOURGOGNE_FRANCHE_COMTE,
    BRETAGNE,
    CENTRE_VAL_DE_LOIRE,
    CORSE,
    GRAND_EST,
    HAUTS_DE_FRANCE,
    ILE_DE_FRANCE,
    NORMANDIE,
    NOUVELLE_AQUITAINE,
    OCCITANIE,
    PAYS_DE_LA_LOIRE,
    PROVENCE_ALPES_COTE_DAZUR,
    GUADELOUPE,
    MARTINIQUE,
    GUYANE,
    LA_REUNION,
    MAYOTTE,
];

const fn dept(code: &'static str, name: &'static str, region: &'static str) -> DepartmentInfo {
    DepartmentInfo { code, name, region }
}

pub const DEPARTMENTS: &[DepartmentInfo] = &[
    dept("01", "Ain", AUVERGNE_RHONE_ALPES),
    dept("02", "Aisne", HAUTS_DE_FRANCE),
    dept("03", "Allier", AUVERGNE_RHONE_ALPES),
    dept("04", "Alpes-de-Haute-Provence", PROVENCE_ALPES_COTE_DAZUR),
    dept("05", "Hautes-Alpes", PROVENCE_ALPES_COTE_DAZUR),
    dept("06", "Alpes-Maritimes", PROVENCE_ALPES_COTE_DAZUR),
    dept("07", "Ardèche", AUVERGNE_RHONE_ALPES),
    dept("08", "Ardennes", GRAND_EST),
    dept("09", "Ariège", OCCITANIE),
    dept("10", "Aube", GRAND_EST),
    dept("11", "Aude", OCCITANIE),
    dept("12", "Aveyron", OCCITANIE),
    dept("13", "Bouches-du-Rhône", PROVENCE_ALPES_COTE_DAZUR),
    dept("14", "Calvados", NORMANDIE),
    dept("15", "Cantal", AUVERGNE_RHONE_ALPES),
    dept("16", "Charente", NOUVELLE_AQUITAINE),
    dept("17", "Charente-Maritime", NOUVELLE_AQUITAINE),
    dept("18", "Cher", CENTRE_VAL_DE_LOIRE),
    dept("19", "Corrèze", NOUVELLE_AQUITAINE),
    dept("2A", "Corse-du-Sud", CORSE),
    dept("2B", "Haute-Corse", CORSE),
    dept("21", "Côte-d'Or", BOURGOGNE_FRANCHE_COMTE),
    dept("22", "Côtes-d'Armor", BRETAGNE),
    dept("23", "Creuse", NOUVELLE_AQUITAINE),
    dept("24", "Dordogne", NOUVELLE_AQUITAINE),
    dept("25", "Doubs", BOURGOGNE_FRANCHE_COMTE),
    dept("26", "Drôme", AUVERGNE_RHONE_ALPES),
    dept("27", "Eure", NORMANDIE),
    dept("28", "Eure-et-Loir", CENTRE_VAL_DE_LOIRE),
    dept("29", "Finistère", BRETAGNE),
    dept("30", "Gard", OCCITANIE),
    dept("31", "Haute-Garonne", OCCITANIE),
    dept("32", "Gers", OCCITANIE),
    dept("33", "Gironde", NOUVELLE_AQUITAINE),
    dept("34", "Hérault", OCCITANIE),
    dept("35", "Ille-et-Vilaine", BRETAGNE),
    dept("36", "Indre", CENTRE_VAL_DE_LOIRE),
    dept("37", "Indre-et-Loire", CENTRE_VAL_DE_LOIRE),
    dept("38", "Isère", AUVERGNE_RHONE_ALPES),
    dept("39", "Jura", BOURGOGNE_FRANCHE_COMTE),
    dept("40", "Landes", NOUVELLE_AQUITAINE),
    dept("41", "Loir-et-Cher", CENTRE_VAL_DE_LOIRE),
    dept("42", "Loire", AUVERGNE_RHONE_ALPES),
    dept("43", "Haute-Loire", AUVERGNE_RHONE_ALPES),
    dept("44", "Loire-Atlantique", PAYS_DE_LA_LOIRE),
    dept("45", "Loiret", CENTRE_VAL_DE_LOIRE),
    dept("46", "Lot", OCCITANIE),
    dept("47", "Lot-et-Garonne", NOUVELLE_AQUITAINE),
    dept("48", "Lozère", OCCITANIE),
    dept("49", "Maine-et-Loire", PAYS_DE_LA_LOIRE),
    dept("50", "Manche", NORMANDIE),
    dept("51", "Marne", GRAND_EST),
    dept("52", "Haute-Marne", GRAND_EST),
    dept("53", "Mayenne", PAYS_DE_LA_LOIRE),
    dept("54", "Meurthe-et-Moselle", GRAND_EST),
    dept("55", "Meuse", GRAND_EST),
    dept("56", "Morbihan", BRETAGNE),
    dept("57", "Moselle", GRAND_EST),
    dept("58", "Nièvre", BOURGOGNE_FRANCHE_COMTE),
    dept("59", "Nord", HAUTS_DE_FRANCE),
    dept("60", "Oise", HAUTS_DE_FRANCE),
    dept("61", "Orne", NORMANDIE),
    dept("62", "Pas-de-Calais", HAUTS_DE_FRANCE),
    dept("63", "Puy-de-Dôme", AUVERGNE_RHONE_ALPES),
    dept("64", "Pyrénées-Atlantiques", NOUVELLE_AQUITAINE),
    dept("65", "Hautes-Pyrénées", OCCITANIE),
    dept("66", "Pyrénées-Orientales", OCCITANIE),
    dept("67", "Bas-Rhin", GRAND_EST),
    dept("68", "Haut-Rhin", GRAND_EST),
    dept("69", "Rhône", AUVERGNE_RHONE_ALPES),
    dept("70", "Haute-Saône", BOURGOGNE_FRANCHE_COMTE),
    dept("71", "Saône-et-Loire", BOURGOGNE_FRANCHE_COMTE),
    dept("72", "Sarthe", PAYS_DE_LA_LOIRE),
    dept("73", "Savoie", AUVERGNE_RHONE_ALPES),
    dept("74", "Haute-Savoie", AUVERGNE_RHONE_ALPES),
    dept("75", "Paris", ILE_DE_FRANCE),
    dept("76", "Seine-Maritime", NORMANDIE),
    dept("77", "Seine-et-Marne", ILE_DE_FRANCE),
    dept("78", "Yvelines", ILE_DE_FRANCE),
    dept("79", "Deux-Sèvres", NOUVELLE_AQUITAINE),
    dept("80", "Somme", HAUTS_DE_FRANCE),
    dept("81", "Tarn", OCCITANIE),
    dept("82", "Tarn-et-Garonne", OCCITANIE),
    dept("83", "Var", PROVENCE_ALPES_COTE_DAZUR),
    dept("84", "Vaucluse", PROVENCE_ALPES_COTE_DAZUR),
    dept("85", "Vendée", PAYS_DE_LA_LOIRE),
    dept("86", "Vienne", NOUVELLE_AQUITAINE),
    dept("87", "Haute-Vienne", NOUVELLE_AQUITAINE),
    dept("88", "Vosges", GRAND_EST),
    dept("89", "Yonne", BOURGOGNE_FRANCHE_COMTE),
    dept("90", "Territoire de Belfort", BOURGOGNE_FRANCHE_COMTE),
    dept("91", "Essonne", ILE_DE_FRANCE),
    dept("92", "Hauts-de-Seine", ILE_DE_FRANCE),
    dept("93", "Seine-Saint-Denis", ILE_DE_FRANCE),
    dept("94", "Val-de-Marne", ILE_DE_FRANCE),
    dept("95", "Val-d'Oise", ILE_DE_FRANCE),
    dept("971", "Guadeloupe", GUADELOUPE),
    dept("972", "Martinique", MARTINIQUE),
    dept("973", "Guyane", GUYANE),
    dept("974", "La Réunion", LA_REUNION),
    dept("976", "Mayotte", MAYOTTE),
];

/// Reference point (regional capital) used to query provider alerts per region
pub const REGION_COORDINATES: &[NamedPlace] = &[
    NamedPlace { name: ILE_DE_FRANCE, latitude: 48.8566, longitude: 2.3522 },
    NamedPlace { name: AUVERGNE_RHONE_ALPES, latitude: 45.7578, longitude: 4.8320 },
    NamedPlace { name: PROVENCE_ALPES_COTE_DAZUR, latitude: 43.2965, longitude: 5.3698 },
    NamedPlace { name: OCCITANIE, latitude: 43.6047, longitude: 1.4442 },
    NamedPlace { name: NOUVELLE_AQUITAINE, latitude: 44.8378, longitude: -0.5792 },
    NamedPlace { name: BRETAGNE, latitude: 48.1173, longitude: -1.6778 },
    NamedPlace { name: NORMANDIE, latitude: 49.4431, longitude: 1.0993 },
    NamedPlace { name: HAUTS_DE_FRANCE, latitude: 50.6292, longitude: 3.0573 },
    NamedPlace { name: GRAND_EST, latitude: 48.5734, longitude: 7.7521 },
    NamedPlace { name: PAYS_DE_LA_LOIRE, latitude: 47.2184, longitude: -1.5536 },
    NamedPlace { name: BOURGOGNE_FRANCHE_COMTE, latitude: 47.3220, longitude: 5.0415 },
    NamedPlace { name: CENTRE_VAL_DE_LOIRE, latitude: 47.9027, longitude: 1.9090 },
    NamedPlace { name: CORSE, latitude: 42.0396, longitude: 9.0129 },
];

/// Main French cities with their department code
pub const MAIN_CITIES: &[(NamedPlace, &str)] = &[
    (NamedPlace { name: "Paris", latitude: 48.8566, longitude: 2.3522 }, "75"),
    (NamedPlace { name: "Marseille", latitude: 43.2965, longitude: 5.3698 }, "13"),
    (NamedPlace { name: "Lyon", latitude: 45.7578, longitude: 4.8320 }, "69"),
    (NamedPlace { name: "Toulouse", latitude: 43.6047, longitude: 1.4442 }, "31"),
    (NamedPlace { name: "Nice", latitude: 43.7102, longitude: 7.2620 }, "06"),
    (NamedPlace { name: "Nantes", latitude: 47.2184, longitude: -1.5536 }, "44"),
    (NamedPlace { name: "Strasbourg", latitude: 48.5734, longitude: 7.7521 }, "67"),
    (NamedPlace { name: "Montpellier", latitude: 43.6108, longitude: 3.8767 }, "34"),
    (NamedPlace { name: "Bordeaux", latitude: 44.8378, longitude: -0.5792 }, "33"),
    (NamedPlace { name: "Lille", latitude: 50.6292, longitude: 3.0573 }, "59"),
];

/// Look up a department by its INSEE code ("29", "2A", "974"...)
///
/// Single-digit codes are accepted with or without the leading zero.
pub fn department(code: &str) -> Option<&'static DepartmentInfo> {
    let code = code.trim();
    let normalized = if code.len() == 1 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("0{code}")
    } else {
        code.to_ascii_uppercase()
    };
    DEPARTMENTS.iter().find(|d| d.code == normalized)
}

pub fn is_department_code(code: &str) -> bool {
    department(code).is_some()
}

pub fn region_coordinates(region: &str) -> Option<&'static NamedPlace> {
    REGION_COORDINATES.iter().find(|r| r.name == region)
}

pub fn departments_in_region(region: &str) -> impl Iterator<Item = &'static DepartmentInfo> + '_ {
    DEPARTMENTS.iter().filter(move |d| d.region == region)
}
