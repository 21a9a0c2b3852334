mod common;

use common::{Workspace, EROS_TWO_ROWS};
use neo_loader::ingest::catalog_builder::build_data_from_csv;
use neo_loader::ingest::sql_script::{build_insert_blocks, write_sql};

const TEMPLATE: &str = "\
CREATE TABLE [dbo].[Asteroid](
\t[id_internal] [int] NOT NULL,
\t[spkid] [int] NOT NULL,
\t[neo_id] [nvarchar](20) NOT NULL,
) ON [PRIMARY]
GO
INSERT [dbo].[Class_Orbital] ([class_description], [class]) VALUES (N'Old', N'OLD');
INSERT [dbo].[Asteroid] ([id_internal]) VALUES (1);
INSERT [dbo].[Asteroid] ([id_internal]) VALUES (2);
GO
";

#[test]
fn catalogue_is_merged_in_memory() {
    let ws = Workspace::new();
    let csv = ws.write("eros.csv", EROS_TWO_ROWS);

    let catalog = build_data_from_csv(&csv).unwrap();
    assert_eq!(catalog.asteroids.len(), 1);
    assert_eq!(catalog.orbits.len(), 1);
    assert_eq!(catalog.classes.get("AMO").map(String::as_str), Some("Amor"));

    let eros = &catalog.asteroids[&1];
    assert_eq!(eros.diameter, Some(16.84));
    assert_eq!(eros.spkid, Some(2000433));
    let orbit = &catalog.orbits["JPL 659"];
    assert_eq!(orbit.id_internal, Some(1));
    assert!(orbit.q.is_some());
}

#[test]
fn script_is_spliced_into_the_template() {
    let ws = Workspace::new();
    let csv = ws.write("eros.csv", EROS_TWO_ROWS);
    let template = ws.write_utf16("template.sql", TEMPLATE);
    let output = ws.path("out.sql");

    let catalog = build_data_from_csv(&csv).unwrap();
    let blocks = build_insert_blocks(&catalog);
    write_sql(&template, &output, &blocks).unwrap();

    let script = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines[0], "CREATE TABLE [dbo].[Asteroid](");
    assert_eq!(lines[2], "\t[spkid] [int] NULL,");
    assert_eq!(lines[3], "\t[neo_id] [nvarchar](20) NULL,");
    assert!(!script.contains("N'OLD'"));
    assert!(!script.contains("VALUES (2);"));

    let classes = lines
        .iter()
        .filter(|l| l.starts_with("INSERT [dbo].[Class_Orbital]"))
        .count();
    assert_eq!(classes, 1);
    assert!(script.contains("N'AMO'"));

    let asteroid = lines
        .iter()
        .find(|l| l.starts_with("INSERT [dbo].[Asteroid]"))
        .unwrap();
    assert!(asteroid.contains("VALUES (1, 2000433, N'433 Eros (A898 PA)', N'433', N'Eros'"));
    assert!(asteroid.ends_with("SYSDATETIME(), N'a0000433');"));

    let orbit = lines.last().unwrap();
    assert!(orbit.starts_with("INSERT [dbo].[Orbit] ([id_orbita]"));
    assert!(orbit.contains("VALUES (N'JPL 659', 2460600.5, 0.29,"));
    assert!(orbit.ends_with("1, N'AMO');"));
}
