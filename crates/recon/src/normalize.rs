use tracing::debug;

use crate::config::DocumentPolicy;
use crate::model::{CourseField, CreditRequirement, PairedBy, PlannedCourseRow, RawTable, TableWarning};

/// A curriculum table projected onto the recognized columns and paired with
/// its credit requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    /// Position of the table in the source document.
    pub source_index: usize,
    pub caption: Option<String>,
    pub fields: Vec<CourseField>,
    pub rows: Vec<PlannedCourseRow>,
    pub requirement: Option<CreditRequirement>,
    pub paired_by: Option<PairedBy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutput {
    pub tables: Vec<NormalizedTable>,
    pub warnings: Vec<TableWarning>,
}

/// Filter, project and pair curriculum tables.
///
/// Positional pairing uses the index within the sentinel-filtered sequence,
/// so a table dropped for lacking the sentinel column never shifts pairing,
/// while a table rejected for lacking the course-name column still consumes
/// its position.
pub fn normalize_tables(
    tables: &[RawTable],
    requirements: &[CreditRequirement],
    policy: &DocumentPolicy,
) -> NormalizeOutput {
    let mut warnings = Vec::new();

    let qualifying: Vec<(usize, &RawTable, Vec<String>)> = tables
        .iter()
        .enumerate()
        .filter_map(|(idx, table)| {
            let header = table.header()?;
            if header.iter().any(|h| *h == policy.sentinel_column) {
                Some((idx, table, header))
            } else {
                debug!(table_index = idx, "table has no sentinel column; skipped");
                None
            }
        })
        .collect();

    if qualifying.is_empty() {
        warnings.push(TableWarning::NoQualifyingTables {
            tables_seen: tables.len(),
        });
        return NormalizeOutput {
            tables: Vec::new(),
            warnings,
        };
    }

    // (filtered position, projected table)
    let mut projected: Vec<(usize, NormalizedTable)> = Vec::new();
    for (position, (idx, table, header)) in qualifying.into_iter().enumerate() {
        match project(idx, table, &header, &policy.fields) {
            Some(t) => projected.push((position, t)),
            None => warnings.push(TableWarning::MissingJoinKey {
                table_index: idx,
                header,
            }),
        }
    }

    let mut claimed = vec![false; requirements.len()];

    if policy.pair_by_label {
        for (_, table) in projected.iter_mut() {
            let Some(caption) = table.caption.as_deref().map(str::trim) else {
                continue;
            };
            if is_requirement_sentence(caption, policy) {
                debug!(table_index = table.source_index, "requirement sentence is not a label");
                continue;
            }
            if let Some(j) = best_label_match(caption, requirements, &claimed) {
                claimed[j] = true;
                table.requirement = Some(requirements[j].clone());
                table.paired_by = Some(PairedBy::Label);
            }
        }
    }

    for (position, table) in projected.iter_mut() {
        if table.paired_by.is_some() {
            continue;
        }
        match requirements.get(*position) {
            Some(req) if !claimed[*position] => {
                claimed[*position] = true;
                table.requirement = Some(req.clone());
                table.paired_by = Some(PairedBy::Position);
            }
            _ => warnings.push(TableWarning::Unpaired {
                table_index: table.source_index,
            }),
        }
    }

    for (req, was_claimed) in requirements.iter().zip(&claimed) {
        if !was_claimed {
            warnings.push(TableWarning::UnclaimedRequirement {
                category: req.category.clone(),
            });
        }
    }

    NormalizeOutput {
        tables: projected.into_iter().map(|(_, t)| t).collect(),
        warnings,
    }
}

fn is_requirement_sentence(caption: &str, policy: &DocumentPolicy) -> bool {
    caption.contains(policy.required_marker.as_str())
        || caption.contains(policy.elective_marker.as_str())
}

/// Unclaimed requirement whose category equals the caption, else the one
/// with the longest category contained in it.
fn best_label_match(
    caption: &str,
    requirements: &[CreditRequirement],
    claimed: &[bool],
) -> Option<usize> {
    requirements
        .iter()
        .enumerate()
        .filter(|(j, req)| {
            let category = req.category.trim();
            !claimed[*j] && !category.is_empty() && caption.contains(category)
        })
        .max_by_key(|(j, req)| {
            let category = req.category.trim();
            // earlier requirement wins ties
            (category == caption, category.chars().count(), std::cmp::Reverse(*j))
        })
        .map(|(j, _)| j)
}

/// Keep the recognized columns in canonical order. `None` when the header
/// has no course-name column.
fn project(
    source_index: usize,
    table: &RawTable,
    header: &[String],
    canonical: &[CourseField],
) -> Option<NormalizedTable> {
    let columns: Vec<(CourseField, usize)> = canonical
        .iter()
        .filter_map(|f| header.iter().position(|h| h == f.label()).map(|col| (*f, col)))
        .collect();

    if !columns.iter().any(|(f, _)| *f == CourseField::CourseName) {
        return None;
    }

    let rows = table
        .rows
        .iter()
        .skip(1)
        .map(|cells| {
            let mut row = PlannedCourseRow::default();
            for (field, col) in &columns {
                let value = cells.get(*col).map(|c| c.trim()).unwrap_or_default();
                row.set(*field, value);
            }
            row
        })
        .collect();

    Some(NormalizedTable {
        source_index,
        caption: table.caption.clone(),
        fields: columns.into_iter().map(|(f, _)| f).collect(),
        rows,
        requirement: None,
        paired_by: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn curriculum(courses: &[&str]) -> RawTable {
        let mut rows: Vec<Vec<String>> = vec![["课程名称", "学分", "理论教学学时", "开课学期"]
            .iter()
            .map(|c| c.to_string())
            .collect()];
        for c in courses {
            rows.push(vec![c.to_string(), "2".into(), "32".into(), "1".into()]);
        }
        RawTable::new(rows)
    }

    fn reqs(categories: &[&str]) -> Vec<CreditRequirement> {
        categories
            .iter()
            .map(|c| CreditRequirement::new(*c, 10, 2))
            .collect()
    }

    fn positional() -> DocumentPolicy {
        DocumentPolicy {
            pair_by_label: false,
            ..DocumentPolicy::default()
        }
    }

    #[test]
    fn projects_canonical_columns_in_order() {
        let t = table(&[
            &["开课学期", " 理论教学学时 ", "课程名称", "备注", "学分"],
            &["1", "48", " 高等数学 ", "x", "5"],
        ]);
        let out = normalize_tables(&[t], &[], &DocumentPolicy::default());
        let nt = &out.tables[0];
        assert_eq!(
            nt.fields,
            vec![CourseField::CourseName, CourseField::Credits, CourseField::AcademicTerm]
        );
        assert_eq!(nt.rows[0].course_name, "高等数学");
        assert_eq!(nt.rows[0].credits.as_deref(), Some("5"));
        assert_eq!(nt.rows[0].academic_term.as_deref(), Some("1"));
        assert_eq!(nt.rows[0].delivery_mode, None);
    }

    #[test]
    fn short_row_yields_empty_cells() {
        let t = table(&[&["课程名称", "理论教学学时", "学分"], &["线性代数"]]);
        let out = normalize_tables(&[t], &[], &DocumentPolicy::default());
        assert_eq!(out.tables[0].rows[0].credits.as_deref(), Some(""));
    }

    #[test]
    fn no_qualifying_tables_warns() {
        let t = table(&[&["课程名称", "学分"], &["高等数学", "5"]]);
        let out = normalize_tables(&[t, RawTable::default()], &reqs(&["A"]), &positional());
        assert!(out.tables.is_empty());
        assert_eq!(out.warnings, vec![TableWarning::NoQualifyingTables { tables_seen: 2 }]);
    }

    #[test]
    fn excluded_table_does_not_shift_positional_pairing() {
        let noise = table(&[&["学期", "周数"], &["1", "18"]]);
        let tables = vec![curriculum(&["a"]), noise, curriculum(&["b"])];
        let out = normalize_tables(&tables, &reqs(&["公共基础课", "专业课"]), &positional());

        assert_eq!(out.tables.len(), 2);
        assert_eq!(out.tables[0].requirement.as_ref().unwrap().category, "公共基础课");
        assert_eq!(out.tables[1].source_index, 2);
        assert_eq!(out.tables[1].requirement.as_ref().unwrap().category, "专业课");
        assert_eq!(out.tables[1].paired_by, Some(PairedBy::Position));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn missing_join_key_consumes_its_position() {
        let keyless = table(&[&["学分", "理论教学学时"], &["2", "32"]]);
        let tables = vec![keyless, curriculum(&["b"])];
        let out = normalize_tables(&tables, &reqs(&["A", "B"]), &positional());

        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].requirement.as_ref().unwrap().category, "B");
        assert!(matches!(
            out.warnings[0],
            TableWarning::MissingJoinKey { table_index: 0, .. }
        ));
        assert_eq!(
            out.warnings[1],
            TableWarning::UnclaimedRequirement { category: "A".into() }
        );
    }

    #[test]
    fn more_tables_than_requirements() {
        let tables = vec![curriculum(&["a"]), curriculum(&["b"])];
        let out = normalize_tables(&tables, &reqs(&["A"]), &positional());
        assert_eq!(out.tables[1].requirement, None);
        assert_eq!(out.tables[1].paired_by, None);
        assert_eq!(out.warnings, vec![TableWarning::Unpaired { table_index: 1 }]);
    }

    #[test]
    fn label_pairing_beats_position() {
        let tables = vec![
            curriculum(&["a"]).with_caption("二、专业课程"),
            curriculum(&["b"]).with_caption("一、公共基础课"),
        ];
        let out = normalize_tables(
            &tables,
            &reqs(&["公共基础课", "专业课"]),
            &DocumentPolicy::default(),
        );
        assert_eq!(out.tables[0].category(), Some("专业课"));
        assert_eq!(out.tables[0].paired_by, Some(PairedBy::Label));
        assert_eq!(out.tables[1].category(), Some("公共基础课"));
        assert_eq!(out.tables[1].paired_by, Some(PairedBy::Label));
    }

    #[test]
    fn unlabelled_table_falls_back_to_free_position() {
        let tables = vec![
            curriculum(&["a"]).with_caption("附表"),
            curriculum(&["b"]).with_caption("公共基础课"),
        ];
        let out = normalize_tables(
            &tables,
            &reqs(&["公共基础课", "专业课"]),
            &DocumentPolicy::default(),
        );
        // position 0 is already claimed by label
        assert_eq!(out.tables[0].requirement, None);
        assert_eq!(out.tables[1].paired_by, Some(PairedBy::Label));
        assert!(out.warnings.contains(&TableWarning::Unpaired { table_index: 0 }));
        assert!(out
            .warnings
            .contains(&TableWarning::UnclaimedRequirement { category: "专业课".into() }));
    }

    #[test]
    fn label_prefers_exact_then_longest_category() {
        let tables = vec![
            curriculum(&["a"]).with_caption("专业基础课"),
            curriculum(&["b"]).with_caption("基础课"),
            curriculum(&["c"]).with_caption("三、专业基础课程"),
        ];
        let out = normalize_tables(
            &tables,
            &reqs(&["基础课", "专业基础课"]),
            &DocumentPolicy::default(),
        );
        assert_eq!(out.tables[0].category(), Some("专业基础课"));
        assert_eq!(out.tables[1].category(), Some("基础课"));
        assert_eq!(out.tables[2].requirement, None);

        let out = normalize_tables(
            &tables[2..],
            &reqs(&["基础课", "专业基础课"]),
            &DocumentPolicy::default(),
        );
        assert_eq!(out.tables[0].category(), Some("专业基础课"));
    }

    #[test]
    fn requirement_sentence_caption_is_not_a_label() {
        let tables = vec![
            curriculum(&["a"]).with_caption("专业课 最低必修学分数:8 最低选修学分数:2"),
            curriculum(&["b"]),
        ];
        let out = normalize_tables(
            &tables,
            &reqs(&["公共基础课", "专业课"]),
            &DocumentPolicy::default(),
        );
        assert_eq!(out.tables[0].category(), Some("公共基础课"));
        assert_eq!(out.tables[0].paired_by, Some(PairedBy::Position));
        assert_eq!(out.tables[1].category(), Some("专业课"));
        assert!(out.warnings.is_empty());
    }

    impl NormalizedTable {
        fn category(&self) -> Option<&str> {
            self.requirement.as_ref().map(|r| r.category.as_str())
        }
    }
}
