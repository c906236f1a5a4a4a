// [libs/infra/db-turso/src/repositories/saved_request.rs]
/*!
 * =================================================================
 * APARATO: SAVED REQUEST REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESPECIFICACIONES DE BÚSQUEDA REUTILIZABLES
 *
 * Los arreglos (employment, schedule, roles, search_fields) viven
 * como TEXT JSON; la forma canónica del query-string se persiste ya
 * normalizada por el estrato superior.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use libsql::{params, Row};
use postulante_domain_models::SavedRequest;
use tracing::{info, instrument};

const SAVED_REQUEST_COLUMNS: &str = "id, user_id, title, query, area, employment, schedule, \
                                     professional_roles, search_fields, cover_letter, query_params, \
                                     created_at, updated_at";

pub struct SavedRequestRepository {
    database_client: DbClient,
}

impl SavedRequestRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta una especificación y retorna su forma persistida.
    #[instrument(skip(self, request), fields(user = request.user_id))]
    pub async fn create(&self, request: &SavedRequest) -> Result<SavedRequest, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query(
                &format!(
                    "INSERT INTO saved_requests
                         (user_id, title, query, area, employment, schedule, professional_roles,
                          search_fields, cover_letter, query_params, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                     RETURNING {}",
                    SAVED_REQUEST_COLUMNS
                ),
                params![
                    request.user_id,
                    request.title.clone(),
                    request.query.clone(),
                    request.area,
                    mapping::encode_json_array(&request.employment),
                    mapping::encode_json_array(&request.schedule),
                    mapping::encode_json_array(&request.professional_roles),
                    mapping::encode_json_array(&request.search_fields),
                    request.cover_letter.clone(),
                    request.query_params.clone()
                ],
            )
            .await?;

        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        let created = map_row_to_saved_request(&row)?;
        info!("🔖 [SAVED_REQUEST]: Specification {} crystallized for user {}.", created.id, created.user_id);
        Ok(created)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<SavedRequest>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM saved_requests WHERE user_id = ?1 ORDER BY updated_at DESC",
                    SAVED_REQUEST_COLUMNS
                ),
                params![user_id],
            )
            .await?;

        let mut requests = Vec::new();
        while let Some(row) = rows.next().await? {
            requests.push(map_row_to_saved_request(&row)?);
        }
        Ok(requests)
    }

    pub async fn find_by_id(&self, request_id: i64, user_id: i64) -> Result<Option<SavedRequest>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM saved_requests WHERE id = ?1 AND user_id = ?2 LIMIT 1",
                    SAVED_REQUEST_COLUMNS
                ),
                params![request_id, user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_saved_request(&row)?)),
            None => Ok(None),
        }
    }

    /// Borrado acotado al dueño. Retorna si la fila existía.
    pub async fn delete(&self, request_id: i64, user_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "DELETE FROM saved_requests WHERE id = ?1 AND user_id = ?2",
                params![request_id, user_id],
            )
            .await?;
        Ok(affected > 0)
    }
}

fn map_row_to_saved_request(row: &Row) -> Result<SavedRequest, DbError> {
    Ok(SavedRequest {
        id: row.get::<i64>(0)?,
        user_id: row.get::<i64>(1)?,
        title: row.get::<String>(2)?,
        query: row.get::<String>(3)?,
        area: mapping::extract_optional_integer(row, 4),
        employment: mapping::decode_json_array(&row.get::<String>(5)?),
        schedule: mapping::decode_json_array(&row.get::<String>(6)?),
        professional_roles: mapping::decode_json_array(&row.get::<String>(7)?),
        search_fields: mapping::decode_json_array(&row.get::<String>(8)?),
        cover_letter: row.get::<String>(9)?,
        query_params: row.get::<String>(10)?,
        created_at: mapping::extract_datetime_or_now(row, 11),
        updated_at: mapping::extract_datetime_or_now(row, 12),
    })
}
