#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components are generated");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{} should be an object schema", name),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();

        for name in ["ErrorResponse", "HealthResponse", "BudgetResponse", "TransactionPage", "Pagination"] {
            assert!(components.schemas.contains_key(name), "missing schema {}", name);
        }
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for key in ["error", "code", "success", "details"] {
            assert!(properties.iter().any(|p| p == key), "ErrorResponse lacks {}", key);
        }
    }

    #[test]
    fn test_budget_response_exposes_derived_metrics() {
        let properties = object_properties("BudgetResponse");
        for key in ["spent_amount", "remaining_amount", "usage_percentage", "transaction_count"] {
            assert!(properties.iter().any(|p| p == key), "BudgetResponse lacks {}", key);
        }
    }

    #[test]
    fn test_pagination_schema_structure() {
        let properties = object_properties("Pagination");
        for key in ["current_page", "total_pages", "total_count", "has_next_page", "has_prev_page"] {
            assert!(properties.iter().any(|p| p == key), "Pagination lacks {}", key);
        }
    }

    #[test]
    fn test_openapi_paths_contain_health_endpoint() {
        let openapi = ApiDoc::openapi();
        let health_get = openapi
            .paths
            .paths
            .get("/health")
            .and_then(|path| path.operations.get(&PathItemType::Get))
            .expect("GET /health is documented");

        assert!(health_get.responses.responses.contains_key("200"));
        assert!(health_get.responses.responses.contains_key("500"));
    }

    #[test]
    fn test_budget_routes_are_documented() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for path in [
            "/api/v1/budgets",
            "/api/v1/budgets/current",
            "/api/v1/budgets/alerts",
            "/api/v1/budgets/summary",
            "/api/v1/budgets/{id}",
            "/api/v1/budgets/{id}/toggle",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }

        let toggle = paths.get("/api/v1/budgets/{id}/toggle").unwrap();
        let patch = toggle.operations.get(&PathItemType::Patch).unwrap();
        assert!(patch.responses.responses.contains_key("404"));
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }
}
