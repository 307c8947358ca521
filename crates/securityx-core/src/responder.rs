//! Canned-response responder behind the chat widget.
//!
//! There is no language model here. The lower-cased message is tested
//! against an ordered table of keyword rules and the first rule with a
//! matching keyword supplies a fixed template. If nothing matches, the
//! default introduction is returned. Rule order is significant: "postgres
//! monitoring" answers with the monitoring template because that rule comes
//! first.
//!
//! The widget endpoint additionally runs [`quick_reply`] before the rule
//! table, which catches greetings and "what is this" questions.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Subject of a canned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Kubernetes,
    Monitoring,
    Docker,
    Postgres,
    Vulnerabilities,
    Alerts,
    Slack,
    Owasp,
    Xss,
    SqlInjection,
    Authentication,
    Api,
    Tls,
    Security,
    Help,
}

/// One keyword rule: any keyword appearing in the message selects the
/// template.
#[derive(Debug)]
pub struct Rule {
    pub topic: Topic,
    pub keywords: &'static [&'static str],
    pub template: &'static str,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// First message shown in an empty conversation.
pub const GREETING: &str = "Hi, I'm Agentia v1.0! 👋 I'm your SecurityX AI assistant. Ask me anything about security, vulnerabilities, or our platform!";

/// Stored and shown when a reply could not be produced.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Reply used when no rule matches.
pub const DEFAULT_REPLY: &str = "I'm SecurityX AI, your security expert assistant. I can help you with:

• **Vulnerability Scanning**: Detect security flaws in your applications
• **Alert Management**: Configure and manage security notifications
• **Best Practices**: OWASP guidelines and secure coding standards
• **Threat Analysis**: Analyze potential security risks
• **Integration Setup**: Connect with Slack and other tools

What security topic would you like to discuss?";

/// The rule table, in match order.
pub static RULES: &[Rule] = &[
    Rule {
        topic: Topic::Kubernetes,
        keywords: &["kubernetes", "k8s"],
        template: "Kubernetes Security Best Practices:

**Pod Security:**
• Use Pod Security Standards (Baseline/Restricted)
• Run containers as non-root users
• Enable read-only root filesystems
• Drop unnecessary Linux capabilities

**Network Policies:**
• Implement strict ingress/egress rules
• Use NetworkPolicies to segment traffic
• Enable service mesh (Istio, Linkerd) for mTLS

**RBAC & Access:**
• Follow principle of least privilege
• Use ServiceAccounts with minimal permissions
• Enable audit logging
• Rotate secrets regularly

**SecurityX Integration:**
Connect your Kubernetes cluster in Dashboard > Integrations to monitor security posture and detect misconfigurations.",
    },
    Rule {
        topic: Topic::Monitoring,
        keywords: &["grafana", "prometheus", "monitoring"],
        template: "Security Monitoring with Grafana & Prometheus:

**Key Metrics to Track:**
• Failed authentication attempts
• Unusual API request patterns
• Resource usage anomalies
• Certificate expiration dates

**Alert Configuration:**
```yaml
- alert: HighFailedLogins
  expr: rate(failed_logins[5m]) > 10
  annotations:
    summary: \"High failed login rate\"
```

**SecurityX Integration:**
Connect Grafana and Prometheus in Dashboard > Integrations to visualize security metrics and create custom dashboards for threat detection.",
    },
    Rule {
        topic: Topic::Docker,
        keywords: &["docker", "container"],
        template: "Docker Security Essentials:

**Image Security:**
• Scan images for vulnerabilities (Trivy, Clair)
• Use minimal base images (Alpine, Distroless)
• Multi-stage builds to reduce attack surface
• Sign images with Docker Content Trust

**Runtime Security:**
```dockerfile
# Run as non-root user
USER 1000:1000

# Read-only filesystem
--read-only --tmpfs /tmp

# Drop capabilities
--cap-drop=ALL --cap-add=NET_BIND_SERVICE
```

**Network Isolation:**
• Use custom bridge networks
• Implement firewall rules
• Enable AppArmor/SELinux profiles

SecurityX Docker integration (coming soon) will scan your containers automatically!",
    },
    Rule {
        topic: Topic::Postgres,
        keywords: &["postgresql", "postgres", "database"],
        template: "PostgreSQL Security Configuration:

**Access Control:**
```
# pg_hba.conf
hostssl all all 0.0.0.0/0 scram-sha-256
```

**Best Practices:**
• Enable SSL/TLS for all connections
• Use strong password hashing (scram-sha-256)
• Implement Row-Level Security (RLS)
• Regular vacuum and security updates
• Audit logging with pgAudit

**Privilege Management:**
• Create separate users per application
• Grant minimal required permissions
• Revoke PUBLIC schema access
• Use connection pooling (PgBouncer)

SecurityX can monitor your database connections and detect suspicious queries. Configure in Integrations tab!",
    },
    Rule {
        topic: Topic::Vulnerabilities,
        keywords: &["vulnerability", "scan"],
        template: "Based on my security analysis, I recommend:

1. **SQL Injection**: Use parameterized queries and prepared statements
2. **XSS Protection**: Implement Content Security Policy (CSP) headers
3. **CSRF**: Use anti-CSRF tokens for state-changing operations
4. **Authentication**: Implement rate limiting and multi-factor authentication

SecurityX can help you identify these vulnerabilities automatically. Would you like me to explain any specific vulnerability type?",
    },
    Rule {
        topic: Topic::Alerts,
        keywords: &["alert", "notification"],
        template: "SecurityX Alert Management helps you:

• **Real-time Monitoring**: Get instant notifications for security events
• **Priority Levels**: Automatic severity classification (Critical, High, Medium, Low)
• **Smart Filtering**: Reduce alert fatigue with intelligent filtering
• **Slack Integration**: Send alerts directly to your team channels

You can configure alert rules in the Dashboard > Alerts section. What type of alerts would you like to set up?",
    },
    Rule {
        topic: Topic::Slack,
        keywords: &["slack", "integration"],
        template: "Setting up Slack integration with SecurityX:

1. Go to **Dashboard > Integrations**
2. Click \"Connect Slack\" (currently in production)
3. Authorize SecurityX to access your workspace
4. Select channels for different alert types
5. Configure notification preferences

Once connected, you'll receive real-time security alerts, vulnerability reports, and system status updates. Need help with webhook configuration?",
    },
    Rule {
        topic: Topic::Owasp,
        keywords: &["owasp", "best practice"],
        template: "OWASP Top 10 Security Best Practices:

1. **Broken Access Control**: Implement proper authorization
2. **Cryptographic Failures**: Use strong encryption (AES-256, RSA-2048)
3. **Injection Flaws**: Validate and sanitize all inputs
4. **Insecure Design**: Follow secure development lifecycle
5. **Security Misconfiguration**: Harden all configurations

SecurityX automatically checks for these issues. Want details on any specific category?",
    },
    Rule {
        topic: Topic::Xss,
        keywords: &["xss", "cross-site"],
        template: "XSS (Cross-Site Scripting) Prevention:

**Input Validation:**
- Sanitize all user inputs
- Use allowlists, not blocklists
- Validate on both client and server

**Output Encoding:**
- HTML entity encode: &lt; &gt; &amp; \" '
- Use context-aware encoding
- Implement CSP headers

**SecurityX Detection:**
We scan for reflected, stored, and DOM-based XSS vulnerabilities automatically. Run a scan to check your application.",
    },
    Rule {
        topic: Topic::SqlInjection,
        keywords: &["sql", "injection"],
        template: "SQL Injection Prevention Strategies:

**Parameterized Queries:**
```sql
-- BAD: \"SELECT * FROM users WHERE id=\" + userId
-- GOOD: Use prepared statements with parameters
```

**Additional Protections:**
• Use ORM frameworks (Prisma, TypeORM)
• Implement least privilege database access
• Enable database query logging
• Regular security audits

SecurityX can scan your API endpoints for SQL injection vulnerabilities. Would you like to start a scan?",
    },
    Rule {
        topic: Topic::Authentication,
        keywords: &["auth", "login", "password"],
        template: "Secure Authentication Best Practices:

**Password Security:**
• Minimum 12 characters
• Use bcrypt/Argon2 for hashing
• Implement account lockout policies

**Session Management:**
• Use secure, HttpOnly cookies
• Implement CSRF protection
• Set appropriate session timeouts

**Multi-Factor Authentication:**
• TOTP-based (Google Authenticator)
• SMS/Email verification
• Hardware tokens for high-security

SecurityX monitors authentication attempts and detects brute force attacks. Enable MFA in Settings > Security.",
    },
    Rule {
        topic: Topic::Api,
        keywords: &["api", "endpoint"],
        template: "API Security Checklist:

**Authentication & Authorization:**
• JWT tokens with short expiration
• OAuth 2.0 / OpenID Connect
• API key rotation policies

**Rate Limiting:**
• Prevent DDoS attacks
• 100 requests/minute per IP
• Progressive delays for violations

**Input Validation:**
• Schema validation (Zod, Joi)
• Request size limits
• Content-Type enforcement

SecurityX can monitor your API endpoints for suspicious activity. Configure API security rules in the Dashboard.",
    },
    Rule {
        topic: Topic::Tls,
        keywords: &["https", "tls", "ssl"],
        template: "HTTPS/TLS Security Configuration:

**Certificate Management:**
• Use TLS 1.3 (disable older versions)
• Let's Encrypt for free certificates
• Set up auto-renewal

**Security Headers:**
```
Strict-Transport-Security: max-age=31536000
Content-Security-Policy: default-src 'self'
X-Frame-Options: DENY
X-Content-Type-Options: nosniff
```

SecurityX checks your SSL/TLS configuration and alerts you to misconfigurations. Run a security audit now?",
    },
    Rule {
        topic: Topic::Security,
        keywords: &["security", "protect"],
        template: "SecurityX provides comprehensive protection:

**Core Features:**
• Automated vulnerability scanning
• Real-time threat detection
• Security alert management
• Compliance monitoring (GDPR, SOC2)

**Integrations:**
• Slack notifications
• GitHub security alerts
• CI/CD pipeline integration
• SIEM system compatibility

Ask me about specific vulnerabilities, best practices, or how to configure SecurityX for your needs!",
    },
    Rule {
        topic: Topic::Help,
        keywords: &["help", "start", "how"],
        template: "Welcome to SecurityX AI! I can help you with:

🔒 **Vulnerability Analysis** - \"How do I prevent SQL injection?\"
🚨 **Alert Management** - \"Set up critical alerts\"
🔗 **Integrations** - \"Connect Slack notifications\"
📊 **Security Reports** - \"Generate compliance report\"
🛡️ **Best Practices** - \"OWASP Top 10 recommendations\"

Just ask me anything about web security, and I'll provide detailed guidance!",
    },
];

/// Which rule, if any, answers `message`.
#[must_use]
pub fn match_topic(message: &str) -> Option<Topic> {
    matching_rule(&message.to_lowercase()).map(|r| r.topic)
}

/// The canned reply for `message`: first matching rule, else the default.
#[must_use]
pub fn respond(message: &str) -> &'static str {
    matching_rule(&message.to_lowercase()).map_or(DEFAULT_REPLY, |r| r.template)
}

fn matching_rule(lowered: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(lowered))
}

// ── Widget quick replies ─────────────────────────────────────────────

/// Greeting lines; one is chosen per greeting.
pub const GREETING_REPLIES: [&str; 4] = [
    "Hey there! 👋 I'm Agentia, your security assistant. How can I help you today?",
    "Hello! Great to see you! I'm here to help with all your security questions.",
    "Hi! 😊 Ready to make your platform more secure? What would you like to know?",
    "Hey! I'm Agentia v1.0, your SecurityX AI. Ask me anything about security!",
];

/// Product overview returned for "what is this" style questions.
pub const ABOUT_REPLY: &str = "SecurityX is a comprehensive security platform that helps you:

🔒 **Scan for Vulnerabilities** - Automatically detect security flaws like SQL injection, XSS, CSRF, and more
🚨 **Manage Alerts** - Get real-time notifications for security threats and anomalies
🔗 **Integrate Services** - Connect Slack, Kubernetes, Grafana, Prometheus, Docker, PostgreSQL and more
📊 **Monitor Analytics** - Track security metrics, compliance scores, and threat trends
🛡️ **Best Practices** - Learn OWASP guidelines, secure coding patterns, and security audits
🤖 **AI-Powered** - Intelligent threat detection and automated security recommendations
📈 **Activity Tracking** - Monitor API calls, user activity, and system events

I'm Agentia v1.0, your AI assistant here to help you navigate all these features. What would you like to explore?";

const ABOUT_PHRASES: [&str; 4] = ["what is this", "what's this", "about", "explain"];

#[allow(clippy::expect_used)]
static GREETING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail.
    Regex::new(r"^(hi|hey|hello|sup|yo|howdy|greetings)").expect("greeting pattern")
});

/// Widget-only shortcut answered without the rule table.
///
/// Greetings are a prefix match on the lower-cased message, so "history"
/// also counts. `pick` chooses among [`GREETING_REPLIES`] (taken modulo the
/// list length).
#[must_use]
pub fn quick_reply(message: &str, pick: usize) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    if GREETING_PATTERN.is_match(&lowered) {
        return Some(GREETING_REPLIES[pick % GREETING_REPLIES.len()]);
    }
    if ABOUT_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(ABOUT_REPLY);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(topic: Topic) -> &'static str {
        RULES
            .iter()
            .find(|r| r.topic == topic)
            .map_or("", |r| r.template)
    }

    #[test]
    fn kubernetes_matches_in_any_case_and_position() {
        for msg in [
            "kubernetes",
            "KUBERNETES",
            "How do I harden my Kubernetes cluster?",
            "pods on kubernetes and also docker and an api",
            "xxKuBeRnEtEsxx",
        ] {
            assert_eq!(respond(msg), template(Topic::Kubernetes), "message: {msg}");
        }
        assert_eq!(match_topic("my k8s setup"), Some(Topic::Kubernetes));
    }

    #[test]
    fn unmatched_message_gets_default() {
        assert_eq!(respond("tell me a joke"), DEFAULT_REPLY);
        assert_eq!(respond(""), DEFAULT_REPLY);
        assert_eq!(match_topic("lorem ipsum"), None);
    }

    #[test]
    fn earlier_rule_wins() {
        // monitoring precedes postgres
        assert_eq!(match_topic("postgres monitoring"), Some(Topic::Monitoring));
        // scan precedes sql
        assert_eq!(match_topic("scan for sql injection"), Some(Topic::Vulnerabilities));
        // "cross-site" precedes "sql"
        assert_eq!(match_topic("cross-site and sql"), Some(Topic::Xss));
    }

    #[test]
    fn substring_matches_inside_words() {
        // "authentication" contains "auth"
        assert_eq!(match_topic("authentication flow"), Some(Topic::Authentication));
        // "rapid" contains "api"
        assert_eq!(match_topic("rapid"), Some(Topic::Api));
        assert_eq!(match_topic("show me"), Some(Topic::Help));
    }

    #[test]
    fn every_rule_is_reachable() {
        for rule in RULES {
            let first = rule.keywords[0];
            assert_eq!(match_topic(first), Some(rule.topic), "keyword: {first}");
        }
    }

    #[test]
    fn greetings_short_circuit() {
        assert_eq!(quick_reply("Hello there", 0), Some(GREETING_REPLIES[0]));
        assert_eq!(quick_reply("hey", 5), Some(GREETING_REPLIES[1]));
        assert_eq!(quick_reply("say hi", 0), None);
    }

    #[test]
    fn about_questions_short_circuit() {
        assert_eq!(quick_reply("So what is this?", 0), Some(ABOUT_REPLY));
        assert_eq!(quick_reply("please EXPLAIN", 0), Some(ABOUT_REPLY));
        assert_eq!(quick_reply("kubernetes", 0), None);
    }
}
