use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension as _, Row, params};

use super::{RecordsStore, SqliteStore};
use crate::records::{
    Department, Formation, NewDepartment, NewFormation, NewStudent, RecordsError, Student,
};

const STUDENT_SELECT: &str = "SELECT s.id, s.name, s.email, s.department_id, d.name
     FROM students s LEFT JOIN departments d ON d.id = s.department_id";

#[async_trait]
impl RecordsStore for SqliteStore {
    async fn list_departments(&self) -> Result<Vec<Department>, RecordsError> {
        let departments = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(Department {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(departments)
    }

    async fn create_department(&self, new: NewDepartment) -> Result<Department, RecordsError> {
        let new = new.validated()?;
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO departments (name) VALUES (?1)",
                params![new.name],
            );
            Ok(match inserted {
                Ok(_) => Ok(Department {
                    id: conn.last_insert_rowid(),
                    name: new.name,
                }),
                Err(err) if is_unique_violation(&err) => Err(RecordsError::DuplicateDepartment),
                Err(err) => Err(err.into()),
            })
        })
        .await?
    }

    async fn create_student(&self, new: NewStudent) -> Result<Student, RecordsError> {
        let new = new.validated()?;
        self.with_conn(move |conn| Ok(insert_student(conn, new))).await?
    }

    async fn list_students(&self) -> Result<Vec<Student>, RecordsError> {
        let students = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare(&format!("{STUDENT_SELECT} ORDER BY s.id"))?;
                let rows = stmt.query_map([], student_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(students)
    }

    async fn get_student(&self, id: i64) -> Result<Option<Student>, RecordsError> {
        let student = self
            .with_conn(move |conn| Ok(find_student(conn, id)?))
            .await?;
        Ok(student)
    }

    async fn create_formation(&self, new: NewFormation) -> Result<Formation, RecordsError> {
        let new = new.validated()?;
        let formation = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO formations (title, theme) VALUES (?1, ?2)",
                    params![new.title, new.theme],
                )?;
                Ok(Formation {
                    id: conn.last_insert_rowid(),
                    title: new.title,
                    theme: new.theme,
                })
            })
            .await?;
        Ok(formation)
    }

    async fn list_formations(&self) -> Result<Vec<Formation>, RecordsError> {
        let formations = self
            .with_conn(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, title, theme FROM formations ORDER BY id")?;
                let rows = stmt.query_map([], formation_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(formations)
    }

    async fn enroll(&self, student_id: i64, formation_id: i64) -> Result<(), RecordsError> {
        self.with_conn(move |conn| {
            let student_exists = exists(conn, "SELECT 1 FROM students WHERE id = ?1", student_id)?;
            let formation_exists =
                exists(conn, "SELECT 1 FROM formations WHERE id = ?1", formation_id)?;
            if !student_exists || !formation_exists {
                return Ok(Err(RecordsError::EnrollmentTargetNotFound));
            }
            conn.execute(
                "INSERT OR IGNORE INTO student_formations (student_id, formation_id)
                 VALUES (?1, ?2)",
                params![student_id, formation_id],
            )?;
            Ok(Ok(()))
        })
        .await?
    }

    async fn student_formations(&self, student_id: i64) -> Result<Vec<Formation>, RecordsError> {
        self.with_conn(move |conn| {
            if !exists(conn, "SELECT 1 FROM students WHERE id = ?1", student_id)? {
                return Ok(Err(RecordsError::StudentNotFound));
            }
            let mut stmt = conn.prepare(
                "SELECT f.id, f.title, f.theme
                 FROM formations f
                 JOIN student_formations sf ON sf.formation_id = f.id
                 WHERE sf.student_id = ?1
                 ORDER BY f.id",
            )?;
            let rows = stmt.query_map(params![student_id], formation_from_row)?;
            Ok(Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?))
        })
        .await?
    }
}

fn insert_student(conn: &Connection, new: NewStudent) -> Result<Student, RecordsError> {
    if !exists(
        conn,
        "SELECT 1 FROM departments WHERE id = ?1",
        new.department_id,
    )? {
        return Err(RecordsError::UnknownDepartment(new.department_id));
    }

    match conn.execute(
        "INSERT INTO students (name, email, department_id) VALUES (?1, ?2, ?3)",
        params![new.name, new.email, new.department_id],
    ) {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => return Err(RecordsError::DuplicateEmail),
        Err(err) => return Err(err.into()),
    }

    find_student(conn, conn.last_insert_rowid())?
        .ok_or_else(|| RecordsError::Storage(anyhow::anyhow!("inserted student vanished")))
}

fn find_student(conn: &Connection, id: i64) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        &format!("{STUDENT_SELECT} WHERE s.id = ?1"),
        params![id],
        student_from_row,
    )
    .optional()
}

fn exists(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        department_id: row.get(3)?,
        department: row.get(4)?,
    })
}

fn formation_from_row(row: &Row<'_>) -> rusqlite::Result<Formation> {
    Ok(Formation {
        id: row.get(0)?,
        title: row.get(1)?,
        theme: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(name: &str, email: &str, department_id: i64) -> NewStudent {
        NewStudent {
            name: name.to_owned(),
            email: email.to_owned(),
            department_id,
        }
    }

    #[tokio::test]
    async fn departments_are_unique_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cs = store
            .create_department(NewDepartment {
                name: "Computer Science".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(cs.name, "Computer Science");

        let err = store
            .create_department(NewDepartment {
                name: "Computer Science".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::DuplicateDepartment));
        assert_eq!(store.list_departments().await.unwrap(), vec![cs]);
    }

    #[tokio::test]
    async fn students_need_a_known_department_and_unique_email() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_student(student("Ada", "ada@example.org", 42))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::UnknownDepartment(42)));

        let math = store
            .create_department(NewDepartment {
                name: "Mathematics".to_owned(),
            })
            .await
            .unwrap();
        let ada = store
            .create_student(student("Ada", "ada@example.org", math.id))
            .await
            .unwrap();
        assert_eq!(ada.department.as_deref(), Some("Mathematics"));

        let err = store
            .create_student(student("Ada Again", "ada@example.org", math.id))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::DuplicateEmail));

        assert_eq!(store.get_student(ada.id).await.unwrap(), Some(ada.clone()));
        assert_eq!(store.get_student(ada.id + 100).await.unwrap(), None);
        assert_eq!(store.list_students().await.unwrap(), vec![ada]);
    }

    #[tokio::test]
    async fn enrollment_is_idempotent_and_checks_both_sides() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dept = store
            .create_department(NewDepartment {
                name: "Physics".to_owned(),
            })
            .await
            .unwrap();
        let emmy = store
            .create_student(student("Emmy", "emmy@example.org", dept.id))
            .await
            .unwrap();
        let course = store
            .create_formation(NewFormation {
                title: "Symmetry".to_owned(),
                theme: "Algebra".to_owned(),
            })
            .await
            .unwrap();

        store.enroll(emmy.id, course.id).await.unwrap();
        store.enroll(emmy.id, course.id).await.unwrap();
        assert_eq!(
            store.student_formations(emmy.id).await.unwrap(),
            vec![course.clone()]
        );

        let err = store.enroll(emmy.id, course.id + 1).await.unwrap_err();
        assert!(matches!(err, RecordsError::EnrollmentTargetNotFound));
        let err = store.student_formations(emmy.id + 1).await.unwrap_err();
        assert!(matches!(err, RecordsError::StudentNotFound));
        assert_eq!(store.list_formations().await.unwrap(), vec![course]);
    }
}
