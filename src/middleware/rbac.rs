// src/middleware/rbac.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{auth::AdminUser, permissions::CrudAction},
};

/// 1. O Trait que define o que é uma Permissão: um módulo e uma ação CRUD
pub trait PermissionDef: Send + Sync + 'static {
    const MODULE: &'static str;
    const ACTION: CrudAction;

    /// Ex: "requests:update"
    fn slug() -> String {
        format!("{}:{}", Self::MODULE, Self::ACTION.as_str())
    }
}

/// 2. O Extractor (Guardião). Depende do `auth_guard` ter rodado antes.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = match Locale::from_request_parts(parts, state).await {
            Ok(locale) => locale,
            Err(never) => match never {},
        };

        let user = parts
            .extensions
            .get::<AdminUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

        if !user.can(T::MODULE, T::ACTION) {
            tracing::warn!("⛔ {} sem permissão '{}'", user.email, T::slug());
            return Err(AppError::Forbidden(T::slug()).to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($($name:ident => $module:literal, $action:ident;)*) => {
        $(
            pub struct $name;
            impl PermissionDef for $name {
                const MODULE: &'static str = $module;
                const ACTION: CrudAction = CrudAction::$action;
            }
        )*
    };
}

permission! {
    PermChatRead => "chat", Read;
    PermChatCreate => "chat", Create;
    PermChatUpdate => "chat", Update;

    PermRequestsRead => "requests", Read;
    PermRequestsCreate => "requests", Create;
    PermRequestsUpdate => "requests", Update;

    PermPermissionsRead => "permissions", Read;
    PermPermissionsCreate => "permissions", Create;
    PermPermissionsUpdate => "permissions", Update;
    PermPermissionsDelete => "permissions", Delete;

    PermStudentsRead => "students", Read;
    PermStudentsCreate => "students", Create;
    PermStudentsUpdate => "students", Update;

    PermTeachersRead => "teachers", Read;
    PermTeachersCreate => "teachers", Create;
    PermTeachersUpdate => "teachers", Update;

    PermEnrollmentsRead => "enrollments", Read;
    PermEnrollmentsCreate => "enrollments", Create;
    PermEnrollmentsUpdate => "enrollments", Update;

    PermSchoolMealsRead => "school_meals", Read;
    PermSchoolMealsCreate => "school_meals", Create;
    PermSchoolMealsUpdate => "school_meals", Update;

    PermOuvidoriaRead => "ouvidoria", Read;
    PermOuvidoriaCreate => "ouvidoria", Create;
    PermOuvidoriaUpdate => "ouvidoria", Update;

    PermTfdRead => "tfd", Read;
    PermTfdCreate => "tfd", Create;
    PermTfdUpdate => "tfd", Update;

    PermHealthProgramsRead => "health_programs", Read;
    PermHealthProgramsCreate => "health_programs", Create;
    PermHealthProgramsUpdate => "health_programs", Update;

    PermDashboardRead => "dashboard", Read;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_joins_module_and_action() {
        assert_eq!(PermRequestsUpdate::slug(), "requests:update");
        assert_eq!(PermSchoolMealsCreate::slug(), "school_meals:create");
    }
}
