// REST path construction for the v1 data and meta APIs

use super::TableAddr;

const DATA_PREFIX: &str = "api/v1/db/data";
const META_PREFIX: &str = "api/v1/db/meta";

#[derive(Debug, Clone)]
pub struct ApiUris {
    data: String,
    meta: String,
}

impl ApiUris {
    pub fn new(base_uri: &str) -> Self {
        let base = base_uri.trim_end_matches('/');
        ApiUris {
            data: format!("{base}/{DATA_PREFIX}"),
            meta: format!("{base}/{META_PREFIX}"),
        }
    }

    pub fn table(&self, table: &TableAddr) -> String {
        join(
            &self.data,
            &[&table.org_name, &table.project_name, &table.table_title],
        )
    }

    pub fn row_detail(&self, table: &TableAddr, row_id: i64) -> String {
        format!("{}/{row_id}", self.table(table))
    }

    pub fn nested_relations(
        &self,
        table: &TableAddr,
        relation_type: &str,
        row_id: i64,
        column_name: &str,
    ) -> String {
        format!(
            "{}/{}",
            self.row_detail(table, row_id),
            join_segments(&[relation_type, column_name])
        )
    }

    pub fn table_meta(&self, table_id: Option<&str>) -> String {
        match table_id {
            Some(id) => join(&self.meta, &["tables", id]),
            None => join(&self.meta, &["tables"]),
        }
    }

    pub fn column_meta(&self, column_id: &str) -> String {
        join(&self.meta, &["columns", column_id])
    }

    pub fn project(&self, project_id: Option<&str>) -> String {
        match project_id {
            Some(id) => join(&self.meta, &["projects", id]),
            None => join(&self.meta, &["projects"]),
        }
    }

    pub fn project_tables(&self, project_id: &str) -> String {
        format!("{}/tables", self.project(Some(project_id)))
    }
}

fn join(prefix: &str, segments: &[&str]) -> String {
    format!("{prefix}/{}", join_segments(segments))
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
