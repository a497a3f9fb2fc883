//! Test requests and the worksheets their items are run on.

use jiff::Timestamp;
use payloads::{
    TestRequestId, TestRequestItemId, WorksheetId, WorksheetItemId,
    requests::{CreateTestRequest, UpsertWorksheet},
    responses::{
        ImportResult, TestRequest, TestRequestItem, TestRequestStatus,
        Worksheet, WorksheetItem, WorksheetItemStatus, WorksheetStatus,
    },
};
use uuid::Uuid;

use super::{ExternalKind, State, StoreError, csv_rows};

impl State {
    pub fn get_test_request(
        &self,
        id: &TestRequestId,
    ) -> Result<TestRequest, StoreError> {
        self.test_requests
            .iter()
            .find(|r| &r.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Test request"))
    }

    pub fn create_test_request(
        &mut self,
        details: CreateTestRequest,
        now: Timestamp,
    ) -> Result<TestRequest, StoreError> {
        if details.tests.is_empty() {
            return Err(StoreError::Invalid(
                "A test request needs at least one test".into(),
            ));
        }
        let patient = self.resolve(ExternalKind::Patient, &details.patient)?;
        let at_location =
            self.resolve(ExternalKind::Location, &details.at_location)?;
        let tests = details
            .tests
            .iter()
            .map(|test| self.resolve(ExternalKind::Concept, test))
            .collect::<Result<Vec<_>, _>>()?;

        let request_no = self.next_number("LRQ");
        let items = tests
            .into_iter()
            .enumerate()
            .map(|(i, test)| TestRequestItem {
                uuid: TestRequestItemId(Uuid::new_v4()),
                order_number: format!("{request_no}-{}", i + 1),
                test,
                status: TestRequestStatus::Pending,
            })
            .collect();

        let request = TestRequest {
            uuid: TestRequestId(Uuid::new_v4()),
            request_no,
            patient,
            at_location,
            urgency: details.urgency,
            status: TestRequestStatus::Pending,
            request_date: details.request_date,
            clinical_note: details.clinical_note,
            tests: items,
            date_created: now,
        };
        self.test_requests.push(request.clone());
        Ok(request)
    }

    fn request_item_mut(
        &mut self,
        id: &TestRequestItemId,
    ) -> Option<&mut TestRequestItem> {
        self.test_requests
            .iter_mut()
            .flat_map(|request| request.tests.iter_mut())
            .find(|item| &item.uuid == id)
    }

    fn set_item_status(&mut self, id: &TestRequestItemId, status: TestRequestStatus) {
        let Some(item) = self.request_item_mut(id) else {
            return;
        };
        item.status = status;
        self.refresh_request_statuses();
    }

    /// A request is in progress while any item is, and completed once every
    /// item that wasn't cancelled is.
    fn refresh_request_statuses(&mut self) {
        for request in &mut self.test_requests {
            let live: Vec<_> = request
                .tests
                .iter()
                .filter(|item| item.status != TestRequestStatus::Cancelled)
                .collect();
            request.status = if live.is_empty() {
                TestRequestStatus::Cancelled
            } else if live.iter().all(|i| i.status == TestRequestStatus::Completed) {
                TestRequestStatus::Completed
            } else if live.iter().any(|i| i.status != TestRequestStatus::Pending) {
                TestRequestStatus::InProgress
            } else {
                TestRequestStatus::Pending
            };
        }
    }

    pub fn get_worksheet(&self, id: &WorksheetId) -> Result<Worksheet, StoreError> {
        self.worksheets
            .iter()
            .find(|w| &w.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Worksheet"))
    }

    /// Build worksheet items for request items not already on `worksheet`.
    /// Only pending request items can be placed.
    fn place_items(
        &mut self,
        worksheet: Option<&Worksheet>,
        items: &[TestRequestItemId],
    ) -> Result<Vec<WorksheetItem>, StoreError> {
        let mut placed = Vec::with_capacity(items.len());
        for id in items {
            if placed
                .iter()
                .any(|p: &WorksheetItem| &p.test_request_item == id)
            {
                continue;
            }
            if let Some(existing) = worksheet.and_then(|w| {
                w.worksheet_items.iter().find(|i| &i.test_request_item == id)
            }) {
                placed.push(existing.clone());
                continue;
            }
            let item = self.request_item_mut(id).ok_or_else(|| {
                StoreError::UnknownReference {
                    kind: "test request item",
                    uuid: id.to_string(),
                }
            })?;
            if item.status != TestRequestStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "{} is already on a worksheet",
                    item.order_number
                )));
            }
            placed.push(WorksheetItem {
                uuid: WorksheetItemId(Uuid::new_v4()),
                test_request_item: *id,
                order_number: item.order_number.clone(),
                status: WorksheetItemStatus::Pending,
                result: None,
            });
        }
        Ok(placed)
    }

    pub fn create_worksheet(
        &mut self,
        details: UpsertWorksheet,
        now: Timestamp,
    ) -> Result<Worksheet, StoreError> {
        self.save_worksheet(None, details, now)
    }

    pub fn update_worksheet(
        &mut self,
        id: &WorksheetId,
        details: UpsertWorksheet,
        now: Timestamp,
    ) -> Result<Worksheet, StoreError> {
        self.save_worksheet(Some(*id), details, now)
    }

    fn save_worksheet(
        &mut self,
        id: Option<WorksheetId>,
        details: UpsertWorksheet,
        now: Timestamp,
    ) -> Result<Worksheet, StoreError> {
        let existing = id.map(|id| self.get_worksheet(&id)).transpose()?;
        if details.test_request_items.is_empty() {
            return Err(StoreError::Invalid(
                "A worksheet needs at least one test".into(),
            ));
        }
        let test = details
            .test
            .as_deref()
            .map(|uuid| self.resolve(ExternalKind::Concept, uuid))
            .transpose()?;
        let responsible_person = details
            .responsible_person
            .as_deref()
            .map(|uuid| self.resolve(ExternalKind::Provider, uuid))
            .transpose()?;
        let items = self.place_items(existing.as_ref(), &details.test_request_items)?;

        // Items dropped from the worksheet go back to the pending pool.
        if let Some(existing) = &existing {
            for removed in existing.worksheet_items.iter().filter(|old| {
                !items.iter().any(|i| i.test_request_item == old.test_request_item)
            }) {
                self.set_item_status(&removed.test_request_item, TestRequestStatus::Pending);
            }
        }
        for item in &items {
            if item.status == WorksheetItemStatus::Pending {
                self.set_item_status(
                    &item.test_request_item,
                    TestRequestStatus::InProgress,
                );
            }
        }

        let worksheet = Worksheet {
            uuid: id.unwrap_or_else(|| WorksheetId(Uuid::new_v4())),
            worksheet_no: match &existing {
                Some(existing) => existing.worksheet_no.clone(),
                None => self.next_number("WKS"),
            },
            worksheet_date: details.worksheet_date,
            status: details.status,
            test,
            responsible_person,
            remarks: details.remarks,
            worksheet_items: items,
            date_created: existing.as_ref().map_or(now, |w| w.date_created),
        };
        match self.worksheets.iter_mut().find(|w| w.uuid == worksheet.uuid) {
            Some(slot) => *slot = worksheet.clone(),
            None => self.worksheets.push(worksheet.clone()),
        }
        Ok(worksheet)
    }

    /// Import rows of `order number, result` into a worksheet.
    ///
    /// Each result completes its request item. The worksheet completes once
    /// every item that wasn't cancelled has a result.
    pub fn import_worksheet_results(
        &mut self,
        id: &WorksheetId,
        content: &str,
        has_header: bool,
    ) -> Result<ImportResult, StoreError> {
        let mut worksheet = self.get_worksheet(id)?;
        let mut result = ImportResult::default();
        let mut completed = Vec::new();

        for (line, cells) in csv_rows(content, has_header) {
            let order_number = cells.first().map(String::as_str).unwrap_or("");
            let value = cells.get(1).map(String::as_str).unwrap_or("");
            let Some(item) = worksheet
                .worksheet_items
                .iter_mut()
                .find(|item| item.order_number == order_number)
            else {
                result.errors.push(format!(
                    "row {line}: {order_number} is not on this worksheet"
                ));
                continue;
            };
            if value.is_empty() {
                result.errors.push(format!("row {line}: result is required"));
                continue;
            }
            if item.status == WorksheetItemStatus::Cancelled {
                result
                    .errors
                    .push(format!("row {line}: {order_number} was cancelled"));
                continue;
            }
            if item.status == WorksheetItemStatus::ResultEntered {
                result.updated_count += 1;
            } else {
                result.created_count += 1;
            }
            item.status = WorksheetItemStatus::ResultEntered;
            item.result = Some(value.to_string());
            completed.push(item.test_request_item);
        }

        let finished = worksheet
            .worksheet_items
            .iter()
            .filter(|i| i.status != WorksheetItemStatus::Cancelled)
            .all(|i| i.status == WorksheetItemStatus::ResultEntered);
        if finished {
            worksheet.status = WorksheetStatus::Completed;
        }
        for item in &completed {
            self.set_item_status(item, TestRequestStatus::Completed);
        }
        if let Some(slot) = self.worksheets.iter_mut().find(|w| &w.uuid == id) {
            *slot = worksheet;
        }

        result.success = result.errors.is_empty();
        if !result.success {
            result.error_file_uuid = Some(Uuid::new_v4().to_string());
        }
        Ok(result)
    }
}
