//! Truy cập dữ liệu lô mất rừng (CSDL GIS)
//! Thuộc tính hành chính lấy qua giao cắt không gian với lớp ranh giới
//! ngay trong truy vấn. Với người dùng bị giới hạn phạm vi, join ranh giới
//! là INNER: lô không phân giải được thuộc tính sẽ rơi khỏi kết quả
//! thay vì lọt ra ngoài.

use crate::{
    error::AppError,
    models::{MatRungFeature, MatRungQuery, PointXy, ScopeDecision, STATUS_VERIFIED},
};
use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder, Row};

const DEFAULT_LIMIT: i64 = 1000;
const MAX_LIMIT: i64 = 5000;

pub struct MatRungRepository {
    db: PgPool,
}

impl MatRungRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Danh sách lô mất rừng theo bộ lọc và quyết định phạm vi.
    /// Gọi sau khi cổng phạm vi đã loại trường hợp `empty_result`.
    pub async fn list(
        &self,
        query: &MatRungQuery,
        decision: &ScopeDecision,
    ) -> Result<Vec<MatRungFeature>, AppError> {
        let scoped = decision.attribute_predicate.is_some();

        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                m.gid,
                m.start_dau::text AS start_dau,
                m.end_sau::text AS end_sau,
                m.mahuyen,
                m.area,
                ST_Area(m.geom::geography) AS dtich,
                m.detection_status,
                m.detection_date,
                m.verified_by,
                m.verified_area,
                m.verification_reason,
                m.verification_notes,
                r.huyen,
                r.xa,
                r.tk,
                r.khoanh,
                ST_X(ST_Centroid(ST_Transform(m.geom, 4326))) AS x,
                ST_Y(ST_Centroid(ST_Transform(m.geom, 4326))) AS y,
                ST_AsGeoJSON(ST_Transform(m.geom, 4326)) AS geometry
            FROM mat_rung m
            "#,
        );

        // Join ranh giới: INNER khi bị giới hạn (fail-closed), LEFT khi chỉ
        // cần hiển thị thuộc tính
        if scoped {
            qb.push(
                r#"JOIN laocai_rg3lr r ON ST_Intersects(
                    ST_Transform(m.geom, 4326), ST_Transform(r.geom, 4326))"#,
            );
        } else {
            qb.push(
                r#"LEFT JOIN laocai_rg3lr r ON ST_Intersects(
                    ST_Transform(m.geom, 4326), ST_Transform(r.geom, 4326))"#,
            );
        }

        qb.push(" WHERE m.geom IS NOT NULL");

        if let Some(from_date) = query.from_date {
            qb.push(" AND m.start_dau::date >= ").push_bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            qb.push(" AND m.start_dau::date <= ").push_bind(to_date);
        }

        // Bộ lọc của người dùng (đã bị phạm vi ghi đè nếu bị giới hạn)
        if let Some(churung) = &query.churung {
            qb.push(" AND r.churung ILIKE ")
                .push_bind(format!("%{churung}%"));
        }

        if let Some(predicate) = &decision.attribute_predicate {
            // Phạm vi ghi đè bộ lọc xã/tiểu khu/khoảnh của query; riêng huyện
            // người dùng vẫn được thu hẹp thêm khi phạm vi chưa ràng buộc
            if let Some(huyen) = &predicate.huyen {
                qb.push(" AND r.huyen = ").push_bind(huyen.clone());
            } else if let Some(huyen) = &query.huyen {
                qb.push(" AND r.huyen = ").push_bind(huyen.clone());
            }
            if let Some(xa) = &predicate.xa {
                qb.push(" AND r.xa = ").push_bind(xa.clone());
            }
            if let Some(tk) = &predicate.tk {
                qb.push(" AND r.tk = ").push_bind(tk.clone());
            }
            if let Some(khoanh) = &predicate.khoanh {
                qb.push(" AND r.khoanh = ").push_bind(khoanh.clone());
            }
        } else {
            // Không bị giới hạn: bộ lọc hành chính của query vẫn áp dụng
            if let Some(huyen) = &query.huyen {
                qb.push(" AND r.huyen = ").push_bind(huyen.clone());
            }
            if let Some(xa) = &query.xa {
                qb.push(" AND r.xa = ").push_bind(xa.clone());
            }
            if let Some(tk) = &query.tk {
                qb.push(" AND r.tk = ").push_bind(tk.clone());
            }
            if let Some(khoanh) = &query.khoanh {
                qb.push(" AND r.khoanh = ").push_bind(khoanh.clone());
            }
        }

        // Hợp hình học phạm vi tính trước: một phép giao duy nhất
        // thay cho phân giải từng lô
        if let Some(geometry) = &decision.spatial_predicate {
            qb.push(" AND ST_Intersects(ST_Transform(m.geom, 4326), ST_GeomFromGeoJSON(")
                .push_bind(geometry.clone())
                .push("))");
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        qb.push(" ORDER BY m.start_dau DESC, m.gid DESC LIMIT ")
            .push_bind(limit);

        let features = qb
            .build_query_as::<MatRungFeature>()
            .fetch_all(&self.db)
            .await?;

        Ok(features)
    }

    /// Một lô theo mã, kèm thuộc tính hành chính
    pub async fn find_by_gid(&self, gid: i32) -> Result<Option<MatRungFeature>, AppError> {
        let feature = sqlx::query_as::<_, MatRungFeature>(
            r#"
            SELECT
                m.gid,
                m.start_dau::text AS start_dau,
                m.end_sau::text AS end_sau,
                m.mahuyen,
                m.area,
                ST_Area(m.geom::geography) AS dtich,
                m.detection_status,
                m.detection_date,
                m.verified_by,
                m.verified_area,
                m.verification_reason,
                m.verification_notes,
                r.huyen,
                r.xa,
                r.tk,
                r.khoanh,
                ST_X(ST_Centroid(ST_Transform(m.geom, 4326))) AS x,
                ST_Y(ST_Centroid(ST_Transform(m.geom, 4326))) AS y,
                ST_AsGeoJSON(ST_Transform(m.geom, 4326)) AS geometry
            FROM mat_rung m
            LEFT JOIN laocai_rg3lr r ON ST_Intersects(
                ST_Transform(m.geom, 4326), ST_Transform(r.geom, 4326))
            WHERE m.gid = $1 AND m.geom IS NOT NULL
            LIMIT 1
            "#,
        )
        .bind(gid)
        .fetch_optional(&self.db)
        .await?;

        Ok(feature)
    }

    /// Centroid của một lô — đầu vào cho phân giải thuộc tính khi ghi
    pub async fn centroid(&self, gid: i32) -> Result<Option<PointXy>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                ST_X(ST_Centroid(ST_Transform(geom, 4326))) AS x,
                ST_Y(ST_Centroid(ST_Transform(geom, 4326))) AS y
            FROM mat_rung
            WHERE gid = $1 AND geom IS NOT NULL
            "#,
        )
        .bind(gid)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| PointXy {
            x: r.get("x"),
            y: r.get("y"),
        }))
    }

    /// Trạng thái hiện tại phục vụ logic giữ-nguyên-diện-tích khi xác minh
    pub async fn verification_state(
        &self,
        gid: i32,
    ) -> Result<Option<(Option<f64>, Option<f64>)>, AppError> {
        let row = sqlx::query("SELECT area, verified_area FROM mat_rung WHERE gid = $1")
            .bind(gid)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|r| (r.get("area"), r.get("verified_area"))))
    }

    /// Ghi kết quả xác minh
    pub async fn apply_verification(
        &self,
        gid: i32,
        reason: &str,
        verified_area: Option<f64>,
        notes: Option<&str>,
        detection_date: NaiveDate,
        verified_by: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE mat_rung
            SET
                detection_status = $1,
                verification_reason = $2,
                verified_area = $3,
                verification_notes = $4,
                detection_date = $5,
                verified_by = $6
            WHERE gid = $7
            "#,
        )
        .bind(STATUS_VERIFIED)
        .bind(reason)
        .bind(verified_area)
        .bind(notes)
        .bind(detection_date)
        .bind(verified_by)
        .bind(gid)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
