//! Tra cứu ranh giới hành chính (PostGIS)
//! Port `BoundaryLookup` tách lõi RBAC khỏi cách triển khai: bản ghi mất
//! rừng và lớp ranh giới có thể nằm khác CSDL. Triển khai Postgres dùng
//! lớp `laocai_rg3lr` (độ mịn tiểu khu) trước, rơi về `laocai_ranhgioihc`
//! (ranh giới xã) khi không có đa giác chứa điểm. Lỗi hay quá hạn đều
//! nghiêng về an toàn: thuộc tính không phân giải → lô bị loại.

use crate::{
    error::AppError,
    models::{AdminAttribution, AttributePredicate, PointXy},
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Duration;

#[async_trait]
pub trait BoundaryLookup: Send + Sync {
    /// Phân giải thuộc tính hành chính cho một lô điểm (centroid),
    /// giữ nguyên thứ tự đầu vào
    async fn resolve_attribution(
        &self,
        points: &[PointXy],
    ) -> Result<Vec<AdminAttribution>, AppError>;

    /// Hợp hình học của mọi đa giác ranh giới khớp predicate — tính một lần
    /// để lọc hàng loạt bằng một phép giao không gian duy nhất thay vì
    /// phân giải từng lô rồi so chuỗi
    async fn scope_union_geometry(
        &self,
        predicate: &AttributePredicate,
    ) -> Result<Option<String>, AppError>;
}

/// Triển khai trên CSDL GIS
pub struct PgBoundaryLookup {
    db: PgPool,
    timeout: Duration,
}

impl PgBoundaryLookup {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn with_timeout<T>(
        &self,
        label: &'static str,
        fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(
                    query = label,
                    timeout_secs = self.timeout.as_secs(),
                    "Boundary lookup timed out"
                );
                Err(AppError::Internal)
            }
        }
    }

    /// Một lượt tra cứu trên một lớp ranh giới; cột tiểu khu khác tên
    /// giữa hai lớp nên truyền vào
    async fn lookup_layer(
        &self,
        table: &str,
        tk_column: &str,
        points: &[PointXy],
    ) -> Result<Vec<AdminAttribution>, AppError> {
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

        let query = format!(
            r#"
            WITH pts AS (
                SELECT ord, ST_SetSRID(ST_MakePoint(x, y), 4326) AS geom
                FROM unnest($1::float8[], $2::float8[]) WITH ORDINALITY AS t(x, y, ord)
            )
            SELECT p.ord, b.huyen, b.xa, b.tk, b.khoanh
            FROM pts p
            LEFT JOIN LATERAL (
                SELECT r.huyen, r.xa, r.{tk_column} AS tk, r.khoanh
                FROM {table} r
                WHERE ST_Intersects(ST_Transform(r.geom, 4326), p.geom)
                LIMIT 1
            ) b ON TRUE
            ORDER BY p.ord
            "#
        );

        let rows = self
            .with_timeout("resolve_attribution", async {
                sqlx::query(&query)
                    .bind(&xs)
                    .bind(&ys)
                    .fetch_all(&self.db)
                    .await
            })
            .await?;

        Ok(rows
            .iter()
            .map(|row| AdminAttribution {
                huyen: row.get("huyen"),
                xa: row.get("xa"),
                tk: row.get("tk"),
                khoanh: row.get("khoanh"),
            })
            .collect())
    }
}

#[async_trait]
impl BoundaryLookup for PgBoundaryLookup {
    async fn resolve_attribution(
        &self,
        points: &[PointXy],
    ) -> Result<Vec<AdminAttribution>, AppError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        // Lớp độ mịn tiểu khu trước
        let mut resolved = self.lookup_layer("laocai_rg3lr", "tk", points).await?;

        // Rơi về ranh giới xã cho các điểm chưa phân giải
        let unresolved: Vec<(usize, PointXy)> = resolved
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_unresolved())
            .map(|(i, _)| (i, points[i]))
            .collect();

        if !unresolved.is_empty() {
            let fallback_points: Vec<PointXy> = unresolved.iter().map(|(_, p)| *p).collect();
            let fallback = self
                .lookup_layer("laocai_ranhgioihc", "tieukhu", &fallback_points)
                .await?;

            for ((index, _), attribution) in unresolved.into_iter().zip(fallback) {
                resolved[index] = attribution;
            }
        }

        Ok(resolved)
    }

    async fn scope_union_geometry(
        &self,
        predicate: &AttributePredicate,
    ) -> Result<Option<String>, AppError> {
        if predicate.is_empty() {
            // Không có ràng buộc thì không có hình học phạm vi
            return Ok(None);
        }

        let geometry: Option<String> = self
            .with_timeout("scope_union_geometry", async {
                sqlx::query_scalar(
                    r#"
                    SELECT ST_AsGeoJSON(ST_Union(ST_Transform(geom, 4326)))
                    FROM laocai_rg3lr
                    WHERE ($1::text IS NULL OR huyen = $1)
                      AND ($2::text IS NULL OR xa = $2)
                      AND ($3::text IS NULL OR tk = $3)
                      AND ($4::text IS NULL OR khoanh = $4)
                    "#,
                )
                .bind(&predicate.huyen)
                .bind(&predicate.xa)
                .bind(&predicate.tk)
                .bind(&predicate.khoanh)
                .fetch_one(&self.db)
                .await
            })
            .await?;

        Ok(geometry)
    }
}
