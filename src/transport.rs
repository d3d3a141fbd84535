use super::*;

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) full_url: String,
    pub(crate) body: Option<String>,
    pub(crate) on_success: Option<String>,
    pub(crate) on_failure: Option<String>,
}

// What became of one delivered response: a 200 whose envelope was applied, a
// non-200/failed response (nothing applied), or a 200 whose body was not a
// usable envelope (nothing applied).
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Processed(ProcessOutcome),
    Dropped { status: u16 },
    Rejected(Error),
}

impl Page {
    pub fn mock_response(&mut self, url: &str, body: &str) -> Result<()> {
        self.mock_response_with_status(url, 200, body)
    }

    pub fn mock_response_with_status(&mut self, url: &str, status: u16, body: &str) -> Result<()> {
        if status == 0 {
            return Err(Error::Transport(
                "status 0 is reserved for network failure".into(),
            ));
        }
        self.responses.insert(
            url.to_string(),
            MockResponse {
                status,
                body: body.to_string(),
            },
        );
        Ok(())
    }

    pub fn ajax_get(&mut self, url: &str) -> Result<()> {
        self.issue_request(RequestMethod::Get, url, None, None, None)
    }

    pub fn ajax_get_with_handlers(
        &mut self,
        url: &str,
        on_success: Option<&str>,
        on_failure: Option<&str>,
    ) -> Result<()> {
        self.issue_request(RequestMethod::Get, url, None, on_success, on_failure)
    }

    pub fn ajax_post(&mut self, url: &str, body: &str) -> Result<()> {
        self.issue_request(RequestMethod::Post, url, Some(body), None, None)
    }

    pub fn ajax_post_with_handlers(
        &mut self,
        url: &str,
        body: &str,
        on_success: Option<&str>,
        on_failure: Option<&str>,
    ) -> Result<()> {
        self.issue_request(RequestMethod::Post, url, Some(body), on_success, on_failure)
    }

    pub fn serialize_form_body(&self, form_id: &str) -> Result<String> {
        let form = self
            .dom
            .by_id(form_id)
            .ok_or_else(|| Error::TargetNotFound(form_id.to_string()))?;
        let tag = self.dom.tag_name(form).unwrap_or("").to_ascii_lowercase();
        if tag != "form" {
            return Err(Error::TypeMismatch {
                id: form_id.to_string(),
                expected: "form".into(),
                actual: tag,
            });
        }
        Ok(serialize_form(&self.dom, form))
    }

    pub fn submit_form(
        &mut self,
        form_id: &str,
        url: &str,
        submit_button: Option<&str>,
    ) -> Result<()> {
        let mut body = self.serialize_form_body(form_id)?;
        if let Some(button) = submit_button {
            body.push_str(&percent_encode(button));
            body.push_str("=1");
        }
        self.issue_request(RequestMethod::Post, url, Some(&body), None, None)
    }

    fn issue_request(
        &mut self,
        method: RequestMethod,
        url: &str,
        body: Option<&str>,
        on_success: Option<&str>,
        on_failure: Option<&str>,
    ) -> Result<()> {
        if url.is_empty() {
            return Err(Error::Transport("request url is empty".into()));
        }

        self.run_handler_script(self.pre_call_handler.clone(), "pre-call")?;

        // The cache buster mirrors the browser-side `url + "&random=" + Math.random()`.
        let buster = format_float(self.next_random_f64());
        let full_url = format!("{url}&random={buster}");
        self.ajax_calls.push(full_url.clone());
        self.ajax_bodies.push(body.map(str::to_string));
        self.trace_ajax_line(format!(
            "[ajax] {} url={} pending={}",
            method.as_str(),
            full_url,
            self.pending.len() + 1
        ));

        self.pending.push(PendingRequest {
            method,
            url: url.to_string(),
            full_url,
            body: body.map(str::to_string),
            on_success: on_success.map(str::to_string),
            on_failure: on_failure.map(str::to_string),
        });
        Ok(())
    }

    // Completes the oldest in-flight request. Responses always arrive in
    // issue order; overlapping requests are neither cancelled nor reordered.
    pub fn deliver_next(&mut self) -> Result<Option<Delivery>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let request = self.pending.remove(0);
        self.trace_ajax_line(format!(
            "[ajax] deliver {} url={} body_chars={}",
            request.method.as_str(),
            request.full_url,
            request.body.as_deref().map(|b| b.chars().count()).unwrap_or(0)
        ));

        let Some(response) = self.responses.get(&request.url).cloned() else {
            self.trace_ajax_line(format!(
                "[ajax] network failure url={}",
                request.full_url
            ));
            self.run_failure_hooks(&request)?;
            self.run_handler_script(self.post_call_handler.clone(), "post-call")?;
            return Ok(Some(Delivery::Dropped { status: 0 }));
        };

        if response.status != 200 {
            self.trace_ajax_line(format!(
                "[ajax] dropped status={} url={}",
                response.status, request.full_url
            ));
            self.run_failure_hooks(&request)?;
            self.run_handler_script(self.post_call_handler.clone(), "post-call")?;
            return Ok(Some(Delivery::Dropped {
                status: response.status,
            }));
        }

        self.trace_ajax_line(format!(
            "[ajax] received {} characters url={}",
            response.body.chars().count(),
            request.full_url
        ));

        let envelope = match Envelope::parse(&response.body) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.trace_ajax_line(format!("[ajax] rejected envelope: {err}"));
                self.run_failure_hooks(&request)?;
                self.run_handler_script(self.post_call_handler.clone(), "post-call")?;
                return Ok(Some(Delivery::Rejected(err)));
            }
        };

        match self.process_envelope(&envelope) {
            Ok(outcome) => {
                self.run_handler_script(request.on_success.clone(), "success")?;
                self.run_handler_script(self.post_call_handler.clone(), "post-call")?;
                Ok(Some(Delivery::Processed(outcome)))
            }
            Err(err) => {
                // Partially applied instructions stand; the failure still
                // reaches the failure hooks before surfacing to the caller.
                self.run_failure_hooks(&request)?;
                self.run_handler_script(self.post_call_handler.clone(), "post-call")?;
                Err(err)
            }
        }
    }

    pub fn deliver_all(&mut self) -> Result<Vec<Delivery>> {
        let mut out = Vec::new();
        while let Some(delivery) = self.deliver_next()? {
            out.push(delivery);
        }
        Ok(out)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn ajax_calls(&self) -> &[String] {
        &self.ajax_calls
    }

    // Request bodies in issue order; None for bodyless GETs.
    pub fn ajax_bodies(&self) -> &[Option<String>] {
        &self.ajax_bodies
    }

    fn run_failure_hooks(&mut self, request: &PendingRequest) -> Result<()> {
        self.run_handler_script(request.on_failure.clone(), "failure")?;
        self.run_handler_script(self.error_handler.clone(), "global-error")
    }

    pub(crate) fn run_handler_script(
        &mut self,
        script: Option<String>,
        label: &str,
    ) -> Result<()> {
        let Some(script) = script else {
            return Ok(());
        };
        self.trace_ajax_line(format!("[ajax] invoking {label} handler"));
        self.exec_script_source(&script)
    }
}
